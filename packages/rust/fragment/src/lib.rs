//! Fragment parsing and the element/text tree the OOB engine walks.
//!
//! This crate provides:
//! - [`parse_fragment`]: response body to [`FragmentTree`], `<template>` wrappers unwrapped
//! - [`walk`]: depth-first visitor that can detach nodes as it goes
//! - HTML serialization of fragment nodes

mod parser;
mod serialize;
mod tree;

pub use parser::{TEMPLATE_TAG, parse_fragment};
pub use tree::{
    Attribute, ElementNode, FragmentNode, FragmentTree, TextNode, Visit, Visitor, walk,
};
