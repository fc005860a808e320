//! Library exports for the URL shortener application
//! 
//! This module exposes internal components for testing and potential library usage.

pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod extract;
pub mod handler;
pub mod middleware;
pub mod model;
pub mod rate_limit;
pub mod repository;
pub mod route;
pub mod service;
pub mod slug;
pub mod state;
