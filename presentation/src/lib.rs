pub mod cli;
pub mod ui;
pub mod web;
