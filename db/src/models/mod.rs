pub mod package;
pub mod proof_image;
pub mod user;
