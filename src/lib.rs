pub mod actions;
pub mod app;
pub mod config;
pub mod directive;
pub mod git;
pub mod github;
pub mod llm;
pub mod path;
pub mod registry;
pub mod styling;
pub mod ui;
