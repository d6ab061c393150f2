mod common;
mod reporting;
mod repository;
mod service;
