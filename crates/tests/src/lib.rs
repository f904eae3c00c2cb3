//! End-to-end tests.

#![cfg(test)]
#![allow(clippy::disallowed_methods)]

mod check;
mod driver;
mod flow;
mod type_test;
