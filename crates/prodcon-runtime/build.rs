//! Build script for prodcon-runtime
//!
//! Produces `OUT_DIR/pc_merged_config.rs`, the compile-time defaults used
//! by `PoolConfig`:
//! 1. Start with library defaults
//! 2. If `PC_CONFIG_RS` is set, read `pub const NAME: TYPE = VALUE;` lines
//!    from that file and let known names override the defaults
//! 3. Emit one `pub const` per parameter
//!
//! Runtime `PC_*` environment variables still override whatever is baked in.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;

struct Param {
    name: &'static str,
    rust_type: &'static str,
    default_value: &'static str,
}

const PARAMS: &[Param] = &[
    Param { name: "CAPACITY", rust_type: "usize", default_value: "25" },
    Param { name: "NUM_PRODUCERS", rust_type: "usize", default_value: "5" },
    Param { name: "NUM_CONSUMERS", rust_type: "usize", default_value: "5" },
    Param { name: "ITEMS_PER_WORKER", rust_type: "usize", default_value: "20" },
    Param { name: "STRATEGY", rust_type: "&str", default_value: "\"condvar\"" },
    Param { name: "LOG_PATH", rust_type: "&str", default_value: "\"log.txt\"" },
    Param { name: "STACK_SIZE", rust_type: "usize", default_value: "256 * 1024" },
    Param { name: "SPAWNER", rust_type: "&str", default_value: "\"native\"" },
];

fn main() {
    let out_dir = env::var("OUT_DIR").expect("OUT_DIR not set");
    let dest = Path::new(&out_dir).join("pc_merged_config.rs");

    let mut values: HashMap<&'static str, String> = PARAMS
        .iter()
        .map(|p| (p.name, p.default_value.to_string()))
        .collect();

    let user_file = env::var("PC_CONFIG_RS").ok();
    if let Some(path) = &user_file {
        println!("cargo:rerun-if-changed={}", path);
        match fs::read_to_string(path) {
            Ok(content) => {
                merge_user_config(&content, &mut values);
                println!("cargo:warning=prodcon: using config overrides from {}", path);
            }
            Err(e) => println!("cargo:warning=prodcon: cannot read PC_CONFIG_RS ({}): {}", path, e),
        }
    }
    println!("cargo:rerun-if-env-changed=PC_CONFIG_RS");

    fs::write(&dest, render(&values, user_file.is_some()))
        .expect("failed to write merged config");
}

/// Apply every recognised `pub const` from the user's file
fn merge_user_config(content: &str, values: &mut HashMap<&'static str, String>) {
    for line in content.lines().map(str::trim) {
        if !line.starts_with("pub const ") {
            continue;
        }
        let Some((name, ty, value)) = split_const(line) else {
            println!("cargo:warning=prodcon: cannot parse config line: {}", line);
            continue;
        };
        match PARAMS.iter().find(|p| p.name == name) {
            Some(param) if param.rust_type == ty => {
                values.insert(param.name, value);
            }
            Some(param) => println!(
                "cargo:warning=prodcon: {} must be {}, found {}; keeping default",
                name, param.rust_type, ty
            ),
            None => println!("cargo:warning=prodcon: unknown config parameter {}", name),
        }
    }
}

/// `pub const NAME: TYPE = VALUE;` -> (NAME, TYPE, VALUE)
fn split_const(line: &str) -> Option<(String, String, String)> {
    let rest = line.strip_prefix("pub const ")?;
    let (name, rest) = rest.split_once(':')?;
    let (ty, rest) = rest.split_once('=')?;
    let value = rest.trim().trim_end_matches(';').trim();
    let ty = ty.trim().replace("&'static str", "&str");
    if value.is_empty() {
        return None;
    }
    Some((name.trim().to_string(), ty, value.to_string()))
}

fn render(values: &HashMap<&'static str, String>, from_user: bool) -> String {
    let mut out = String::from("// Generated by prodcon-runtime/build.rs\n");
    if from_user {
        out.push_str("// Library defaults merged with PC_CONFIG_RS overrides\n");
    }
    out.push('\n');
    for p in PARAMS {
        let ty = if p.rust_type == "&str" { "&'static str" } else { p.rust_type };
        out.push_str(&format!("pub const {}: {} = {};\n", p.name, ty, values[p.name]));
    }
    out
}
