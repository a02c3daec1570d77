pub mod callbacks;
pub mod commands;
pub mod keyboards;
pub mod media;
pub mod photo;
pub mod responses;
