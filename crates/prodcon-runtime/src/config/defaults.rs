//! Compile-time defaults, generated by `build.rs`
//!
//! Override at build time with `PC_CONFIG_RS=path/to/pc_config.rs`.

include!(concat!(env!("OUT_DIR"), "/pc_merged_config.rs"));
