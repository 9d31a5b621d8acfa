#![allow(dead_code)]

use std::path::PathBuf;

#[path = "../../src/fixtures.rs"]
mod fixtures;

pub(crate) use fixtures::{encrypted, pdf_with_pages, FixturePage};

pub fn bills_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("bills");
    path
}
