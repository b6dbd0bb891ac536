// Copyright 2023 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! In-memory firmware device tree and its construction protocol.
//!
//! Device nodes are built through a strict begin/name/type/property/finish
//! sequence; a node becomes part of the tree only when it is finished.
//! At most one node is under construction at any time.

use indexmap::IndexMap;
use remain::sorted;
use thiserror::Error as ThisError;

use crate::propval::FromPropval;
use crate::propval::ToPropval;

#[sorted]
#[derive(ThisError, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("property {0:?} already set on this node")]
    DuplicateProperty(String),
    #[error("invalid string value {0:?}")]
    InvalidString(String),
    #[error("node finished without a device name")]
    MissingNodeName,
    #[error("device name may be set at most once")]
    NameAlreadySet,
    #[error("a device node is already open")]
    NodeAlreadyOpen,
    #[error("no device node is open")]
    NoOpenNode,
    #[error("no committed node at path {0:?}")]
    NoSuchPath(String),
    #[error("device type may be set at most once")]
    TypeAlreadySet,
}

pub type Result<T> = std::result::Result<T, Error>;

/// One committed entry in the device tree.
///
/// Sibling order is the order in which nodes were finished; consumers that
/// probe by enumeration (console selection in particular) rely on it.
#[derive(Clone, Debug, Default)]
pub struct PromNode {
    name: String,
    device_type: Option<String>,
    props: IndexMap<String, Vec<u8>>,
    children: Vec<PromNode>,
}

impl PromNode {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn device_type(&self) -> Option<&str> {
        self.device_type.as_deref()
    }

    /// Raw encoded bytes of a property, if present.
    pub fn prop_raw(&self, name: &str) -> Option<&[u8]> {
        self.props.get(name).map(Vec::as_slice)
    }

    /// Decoded property value, `None` if absent or not decodable as `T`.
    pub fn prop<T: FromPropval>(&self, name: &str) -> Option<T> {
        T::from_propval(self.prop_raw(name)?)
    }

    /// Property names in insertion order.
    pub fn prop_names(&self) -> impl Iterator<Item = &str> {
        self.props.keys().map(String::as_str)
    }

    pub fn children(&self) -> &[PromNode] {
        &self.children
    }

    // First child carrying `name`. Duplicate sibling names are legal (the
    // consumer disambiguates by unit address); path lookup resolves to the
    // earliest committed one.
    fn child(&self, name: &str) -> Option<&PromNode> {
        self.children.iter().find(|c| c.name == name)
    }

    fn child_mut(&mut self, name: &str) -> Option<&mut PromNode> {
        self.children.iter_mut().find(|c| c.name == name)
    }
}

// A node that has been begun but not yet finished.
struct OpenNode {
    parent: Vec<String>,
    name: Option<String>,
    device_type: Option<String>,
    props: IndexMap<String, Vec<u8>>,
}

/// Device tree under construction.
///
/// The root node exists from the start and is the tree's own container: it
/// is never begun or finished, and it may carry properties of its own (set
/// through [`PromTree::set_root_prop`]).
///
/// # Example
///
/// ```rust
/// use prom_tree::PromTree;
///
/// # fn main() -> prom_tree::Result<()> {
/// let mut tree = PromTree::new();
/// tree.begin_node("/")?;
/// tree.set_name("obio")?;
/// tree.set_type("hierarchical")?;
/// tree.set_prop("#address-cells", 2u32)?;
/// tree.finish_node()?;
/// assert!(tree.node("/obio").is_some());
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct PromTree {
    root: PromNode,
    open: Option<OpenNode>,
}

// `path` must be absolute; "/" names the root.
fn split_path(path: &str) -> Result<Vec<String>> {
    let stripped = path
        .strip_prefix('/')
        .ok_or_else(|| Error::NoSuchPath(path.to_owned()))?;
    Ok(stripped
        .split('/')
        .filter(|c| !c.is_empty())
        .map(str::to_owned)
        .collect())
}

impl PromTree {
    pub fn new() -> Self {
        PromTree::default()
    }

    /// Open a new device node whose parent is the committed node at
    /// `parent`. The node is not part of the tree until
    /// [`PromTree::finish_node`] commits it.
    pub fn begin_node(&mut self, parent: &str) -> Result<()> {
        if self.open.is_some() {
            return Err(Error::NodeAlreadyOpen);
        }
        let components = split_path(parent)?;
        if self.lookup(&components).is_none() {
            return Err(Error::NoSuchPath(parent.to_owned()));
        }
        self.open = Some(OpenNode {
            parent: components,
            name: None,
            device_type: None,
            props: IndexMap::new(),
        });
        Ok(())
    }

    /// Set the open node's name. Mandatory, at most once.
    pub fn set_name(&mut self, name: &str) -> Result<()> {
        let open = self.open.as_mut().ok_or(Error::NoOpenNode)?;
        if open.name.is_some() {
            return Err(Error::NameAlreadySet);
        }
        open.name = Some(name.to_owned());
        Ok(())
    }

    /// Set the open node's device type. Optional, at most once.
    pub fn set_type(&mut self, device_type: &str) -> Result<()> {
        let open = self.open.as_mut().ok_or(Error::NoOpenNode)?;
        if open.device_type.is_some() {
            return Err(Error::TypeAlreadySet);
        }
        open.device_type = Some(device_type.to_owned());
        Ok(())
    }

    /// Attach an encoded property to the open node.
    pub fn set_prop<T: ToPropval>(&mut self, name: &str, value: T) -> Result<()> {
        let value = value.to_propval()?;
        let open = self.open.as_mut().ok_or(Error::NoOpenNode)?;
        if open.props.contains_key(name) {
            return Err(Error::DuplicateProperty(name.to_owned()));
        }
        open.props.insert(name.to_owned(), value);
        Ok(())
    }

    /// Attach an encoded property to the root container node. Valid only
    /// while no device node is open.
    pub fn set_root_prop<T: ToPropval>(&mut self, name: &str, value: T) -> Result<()> {
        if self.open.is_some() {
            return Err(Error::NodeAlreadyOpen);
        }
        let value = value.to_propval()?;
        if self.root.props.contains_key(name) {
            return Err(Error::DuplicateProperty(name.to_owned()));
        }
        self.root.props.insert(name.to_owned(), value);
        Ok(())
    }

    /// Commit the open node as the last child of its parent.
    pub fn finish_node(&mut self) -> Result<()> {
        let open = self.open.take().ok_or(Error::NoOpenNode)?;
        let name = open.name.ok_or(Error::MissingNodeName)?;
        let parent = self
            .lookup_mut(&open.parent)
            .ok_or_else(|| Error::NoSuchPath(format!("/{}", open.parent.join("/"))))?;
        parent.children.push(PromNode {
            name,
            device_type: open.device_type,
            props: open.props,
            children: Vec::new(),
        });
        Ok(())
    }

    pub fn root(&self) -> &PromNode {
        &self.root
    }

    /// Committed node at an absolute slash-delimited path.
    pub fn node(&self, path: &str) -> Option<&PromNode> {
        self.lookup(&split_path(path).ok()?)
    }

    fn lookup(&self, components: &[String]) -> Option<&PromNode> {
        let mut node = &self.root;
        for name in components {
            node = node.child(name)?;
        }
        Some(node)
    }

    fn lookup_mut(&mut self, components: &[String]) -> Option<&mut PromNode> {
        let mut node = &mut self.root;
        for name in components {
            node = node.child_mut(name)?;
        }
        Some(node)
    }
}
