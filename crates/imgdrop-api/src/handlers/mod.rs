pub mod health;
pub mod image;
pub mod index;
pub mod pages;
pub mod view;
