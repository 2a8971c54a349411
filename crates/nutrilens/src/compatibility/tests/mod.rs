mod alternatives;
mod common;
mod scoring;
