#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::return_self_not_must_use)]

//! Core of tsref.
//!
//! A hook-based resolution pipeline ([`resolver`]) and the
//! [`PathRedirector`] plugin, which sends requests for files under a
//! TypeScript project's `outDir` back to the matching file under `rootDir`.

pub mod config;
pub mod error;
pub mod fs;
pub mod paths;
pub mod redirect;
pub mod resolver;
pub mod tsconfig;
pub mod version;

pub use config::Config;
pub use error::Error;
pub use fs::{FileSystem, FsError, MemoryFileSystem, TokioFileSystem};
pub use redirect::{Decision, DeclineReason, PathRedirector, Redirect, RedirectOptions};
pub use resolver::{
    stages, DependencyTracker, Hook, HookResult, ResolveContext, ResolveError, ResolveRequest,
    Resolver, ResolverPlugin,
};
pub use tsconfig::{parse_tsconfig, CompilerOptions, SourceLayout, TsConfig};
pub use version::VERSION;
