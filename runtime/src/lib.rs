// Copyright 2026 Vidgrab Contributors
// SPDX-License-Identifier: Apache-2.0

//! vidgrab runtime library: headless-browser m3u8 manifest extraction for
//! embedded video players, with an HTTP front end that rewrites the results
//! through a proxy.

pub mod cli;
pub mod config;
pub mod error;
pub mod extractor;
pub mod manifest;
pub mod pool;
pub mod proxy;
pub mod renderer;
pub mod report;
pub mod rest;
pub mod target;
