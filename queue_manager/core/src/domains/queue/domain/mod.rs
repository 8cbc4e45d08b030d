pub mod admin;
pub mod model;
pub mod ordering;
pub mod repository;
pub mod schedule;
pub mod service;
