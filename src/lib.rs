pub mod cli;
pub mod collectors;
pub mod exporter;
pub mod redis;

/// Build metadata generated by `build.rs`.
pub mod built_info {
    #![allow(clippy::all, clippy::pedantic)]
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}
