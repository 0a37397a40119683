pub mod agent;
pub mod post;
pub mod reference_image;
