pub mod agents;
pub mod auto_post;
pub mod health;
