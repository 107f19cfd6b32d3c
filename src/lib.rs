//! Makegen core library.
//!
//! Makegen reads a YAML `Makegenfile`, resolves it into a target graph and
//! renders one line-oriented makefile per source directory for a chosen
//! backend (Watcom WMake, Unix make or NMake). Backends differ only in the
//! [`policy::GeneratorPolicy`] and toolchain data they carry, plus one
//! strategy for composing the native build command.

pub mod ast;
pub mod backend;
pub mod cli;
pub mod config;
pub mod generator;
pub mod graph;
pub mod local_gen;
pub mod manifest;
pub mod policy;
pub mod project;
pub mod quote;
pub mod runner;
