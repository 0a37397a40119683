pub mod agent;
pub mod ids;
pub mod post;
pub mod reference_image;
