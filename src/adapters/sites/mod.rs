pub mod caschys_blog;
pub mod dark_legacy;
pub mod explosm;
pub mod heise;
pub mod mactechnews;
pub mod mein_mmo;
pub mod merkur;
pub mod oglaf;
pub mod tagesschau;
