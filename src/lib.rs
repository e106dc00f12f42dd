// Copyright 2024 FastLabs Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! tlog is a structured logging library that writes one line per record, attaches call stacks to
//! severe records and fans every line out to several destinations.
//!
//! # Overview
//!
//! A log call on a [`Logger`] becomes a [`Record`] carrying a level, a message, the caller's source
//! location and a list of key-value [`Attr`]s. The record passes through a chain of
//! [`Handler`]s: the [`StacktraceHandler`](handler::StacktraceHandler) attaches the caller's stack
//! to records at or above its threshold, and an encoding handler renders the record and hands the
//! bytes to an [`Append`]. [`Outputs`](append::Outputs) writes every record to stdout, stderr and
//! any number of files.
//!
//! # Examples
//!
//! Set up from options:
//!
//! ```
//! use tlog::LogLevel;
//! use tlog::Opts;
//! use tlog::Tlog;
//! use tlog::kv::Attr;
//!
//! let tlog = Tlog::new(Opts {
//!     level: LogLevel::Info,
//!     path: "stderr".to_string(),
//!     stacktrace_level: Some(LogLevel::Error),
//!     ..Opts::default()
//! })
//! .unwrap();
//!
//! let logger = tlog.logger().with([Attr::string("service", "api")]);
//! logger.info("listening");
//! logger.error("connection lost");
//!
//! tlog.close().unwrap();
//! ```
//!
//! Assemble a handler chain by hand:
//!
//! ```
//! use std::sync::Arc;
//!
//! use tlog::Level;
//! use tlog::Logger;
//! use tlog::append::Testing;
//! use tlog::handler::HandlerOptions;
//! use tlog::handler::StacktraceHandler;
//! use tlog::handler::TextHandler;
//! use tlog::kv::Attr;
//!
//! let testing = Testing::default();
//! let text = TextHandler::new(Arc::new(testing.clone()), HandlerOptions::default());
//! let logger = Logger::new(Arc::new(StacktraceHandler::new(Arc::new(text), Level::Error)));
//!
//! logger
//!     .with_group("req")
//!     .log(Level::Info, "served", [Attr::int("status", 200)]);
//! assert!(testing.contents().ends_with("msg=served req.status=200\n"));
//! ```

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod append;
pub mod buffer;
pub mod handler;
pub mod kv;
pub mod record;
pub mod stacktrace;
pub mod str;
pub mod trap;

mod error;
mod logger;
mod opts;
mod tlog;

pub use self::append::Append;
pub use self::error::Error;
pub use self::handler::Handler;
pub use self::kv::Attr;
pub use self::kv::Value;
pub use self::logger::Logger;
pub use self::opts::Format;
pub use self::opts::LogLevel;
pub use self::opts::Opts;
pub use self::record::Level;
pub use self::record::Record;
pub use self::str::Str;
pub use self::tlog::Tlog;
pub use self::trap::Trap;
