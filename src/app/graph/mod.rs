mod build;
mod filter;
mod interaction;
mod view;

pub(in crate::app) use filter::{FilterState, apply_visibility};
