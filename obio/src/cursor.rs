// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Capability interface over the interpreter-owned tree cursor.

use prom_tree::PromTree;
use prom_tree::ToPropval;

use crate::Result;

/// The tree-construction operations the bus probe needs from whoever owns
/// the global device-tree cursor.
///
/// Construction is strictly nested with depth one: a single node is opened
/// with [`TreeCursor::begin_node`], described, and committed with
/// [`TreeCursor::finish_node`] before the next one is begun.
pub trait TreeCursor {
    /// Open a new node under the committed node at `parent`.
    fn begin_node(&mut self, parent: &str) -> Result<()>;
    /// Name the open node. Mandatory before finishing.
    fn set_name(&mut self, name: &str) -> Result<()>;
    /// Classify the open node (`"serial"`, `"block"`, ...). Optional.
    fn set_type(&mut self, device_type: &str) -> Result<()>;
    /// Attach an encoded property to the open node.
    fn set_prop<T: ToPropval>(&mut self, name: &str, value: T) -> Result<()>;
    /// Attach an encoded property to the tree's root container node.
    fn set_root_prop<T: ToPropval>(&mut self, name: &str, value: T) -> Result<()>;
    /// Commit the open node into the tree.
    fn finish_node(&mut self) -> Result<()>;
}

impl TreeCursor for PromTree {
    fn begin_node(&mut self, parent: &str) -> Result<()> {
        Ok(PromTree::begin_node(self, parent)?)
    }

    fn set_name(&mut self, name: &str) -> Result<()> {
        Ok(PromTree::set_name(self, name)?)
    }

    fn set_type(&mut self, device_type: &str) -> Result<()> {
        Ok(PromTree::set_type(self, device_type)?)
    }

    fn set_prop<T: ToPropval>(&mut self, name: &str, value: T) -> Result<()> {
        Ok(PromTree::set_prop(self, name, value)?)
    }

    fn set_root_prop<T: ToPropval>(&mut self, name: &str, value: T) -> Result<()> {
        Ok(PromTree::set_root_prop(self, name, value)?)
    }

    fn finish_node(&mut self) -> Result<()> {
        Ok(PromTree::finish_node(self)?)
    }
}
