//! Schema path resolution over the footer's flat, depth-first schema list.
//!
//! The footer stores the schema tree as a pre-order list in which each group
//! node declares how many children follow it. [`SchemaWalker`] rebuilds the
//! dotted path of every node from that list with an explicit stack of open
//! parents, and [`resolve_leaf`] uses it to find the leaf a column chunk's
//! `path_in_schema` refers to.

use parquet::basic::{ConvertedType, LogicalType, Repetition, TimeUnit, Type as PhysicalType};
use parquet::schema::types::Type;
use serde::Serialize;

/// Default decimal precision when the schema does not state one.
pub const DEFAULT_DECIMAL_PRECISION: i32 = 10;
/// Default decimal scale when the schema does not state one.
pub const DEFAULT_DECIMAL_SCALE: i32 = 0;

/// One entry of the flat schema list.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaNode {
    /// Field name; the root and placeholder nodes may be empty.
    pub name: String,
    /// Number of children for group nodes, `None` for leaves.
    pub num_children: Option<usize>,
    /// Repetition; the root has none.
    pub repetition: Option<Repetition>,
    /// Physical type, leaves only.
    pub physical_type: Option<PhysicalType>,
    /// Byte width of FIXED_LEN_BYTE_ARRAY leaves.
    pub type_length: i32,
    /// Logical type annotation.
    pub logical_type: Option<LogicalType>,
    /// Legacy converted type annotation.
    pub converted_type: ConvertedType,
    /// Decimal precision, negative when unset.
    pub precision: i32,
    /// Decimal scale, negative when unset.
    pub scale: i32,
}

impl SchemaNode {
    /// A group node with `children` direct children.
    pub fn group(name: impl Into<String>, children: usize) -> Self {
        SchemaNode {
            name: name.into(),
            num_children: Some(children),
            repetition: None,
            physical_type: None,
            type_length: -1,
            logical_type: None,
            converted_type: ConvertedType::NONE,
            precision: -1,
            scale: -1,
        }
    }

    /// A leaf node of the given physical type.
    pub fn leaf(name: impl Into<String>, physical: PhysicalType) -> Self {
        SchemaNode {
            num_children: None,
            physical_type: Some(physical),
            repetition: Some(Repetition::OPTIONAL),
            ..SchemaNode::group(name, 0)
        }
    }

    fn is_leaf(&self) -> bool {
        self.physical_type.is_some() && self.num_children.unwrap_or(0) == 0
    }
}

/// Flatten a parquet schema tree into the footer's depth-first list.
pub fn flatten_schema(root: &Type) -> Vec<SchemaNode> {
    let mut out = Vec::new();
    push_node(root, &mut out);
    out
}

fn push_node(ty: &Type, out: &mut Vec<SchemaNode>) {
    let info = ty.get_basic_info();
    let mut node = SchemaNode::group(info.name(), 0);
    node.repetition = info.has_repetition().then(|| info.repetition());
    node.logical_type = info.logical_type_ref().cloned();
    node.converted_type = info.converted_type();

    match ty {
        Type::PrimitiveType {
            physical_type,
            type_length,
            scale,
            precision,
            ..
        } => {
            node.num_children = None;
            node.physical_type = Some(*physical_type);
            node.type_length = *type_length;
            node.precision = *precision;
            node.scale = *scale;
            out.push(node);
        }
        Type::GroupType { fields, .. } => {
            node.num_children = Some(fields.len());
            out.push(node);
            for field in fields {
                push_node(field, out);
            }
        }
    }
}

struct Frame {
    path: Vec<String>,
    remaining: usize,
}

/// A node visited by [`SchemaWalker`].
#[derive(Debug, Clone, PartialEq)]
pub struct WalkedNode<'a> {
    /// Position in the flat list.
    pub index: usize,
    /// Path segments from the root's first child down to this node.
    pub path: Vec<String>,
    /// The node itself.
    pub node: &'a SchemaNode,
}

/// Iterates the flat schema list, reconstructing each node's path.
///
/// The first node is the schema root: it opens the outermost frame but never
/// contributes a path segment, and is not yielded. Nodes with empty names are
/// not yielded either, but still open a frame for their children.
pub struct SchemaWalker<'a> {
    nodes: &'a [SchemaNode],
    next: usize,
    stack: Vec<Frame>,
}

impl<'a> SchemaWalker<'a> {
    /// Start a walk over `nodes`.
    pub fn new(nodes: &'a [SchemaNode]) -> Self {
        SchemaWalker {
            nodes,
            next: 0,
            stack: Vec::new(),
        }
    }
}

impl<'a> Iterator for SchemaWalker<'a> {
    type Item = WalkedNode<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let index = self.next;
            let node = self.nodes.get(index)?;
            self.next += 1;

            while self.stack.last().is_some_and(|f| f.remaining == 0) {
                self.stack.pop();
            }
            let mut path = match self.stack.last_mut() {
                Some(frame) => {
                    frame.remaining -= 1;
                    frame.path.clone()
                }
                None => Vec::new(),
            };

            let is_root = index == 0;
            let named = !is_root && !node.name.is_empty();
            if named {
                path.push(node.name.clone());
            }
            if let Some(children) = node.num_children.filter(|n| *n > 0) {
                self.stack.push(Frame {
                    path: path.clone(),
                    remaining: children,
                });
            }
            if named {
                return Some(WalkedNode { index, path, node });
            }
        }
    }
}

/// Resolved view of a leaf column.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaLeaf {
    /// Dotted path of the leaf.
    pub path: String,
    /// Physical type.
    pub physical_type: PhysicalType,
    /// Logical type annotation.
    pub logical_type: Option<LogicalType>,
    /// Converted type annotation.
    pub converted_type: ConvertedType,
    /// Decimal precision, when stated.
    pub precision: Option<i32>,
    /// Decimal scale, when stated.
    pub scale: Option<i32>,
    /// Byte width of FIXED_LEN_BYTE_ARRAY leaves.
    pub type_length: i32,
}

impl SchemaLeaf {
    fn from_walked(walked: &WalkedNode<'_>, physical_type: PhysicalType) -> Self {
        let node = walked.node;
        let (mut precision, mut scale) = (
            (node.precision > 0).then_some(node.precision),
            (node.scale >= 0).then_some(node.scale),
        );
        if let Some(LogicalType::Decimal {
            scale: s,
            precision: p,
        }) = &node.logical_type
        {
            precision = Some(*p);
            scale = Some(*s);
        }
        SchemaLeaf {
            path: walked.path.join("."),
            physical_type,
            logical_type: node.logical_type.clone(),
            converted_type: node.converted_type,
            precision,
            scale,
            type_length: node.type_length,
        }
    }

    /// Decimal `(precision, scale)`, defaulting to `(10, 0)`.
    pub fn decimal_precision_scale(&self) -> (i32, i32) {
        (
            self.precision.unwrap_or(DEFAULT_DECIMAL_PRECISION),
            self.scale.unwrap_or(DEFAULT_DECIMAL_SCALE),
        )
    }

    /// Display form of the logical type.
    pub fn logical_type_display(&self) -> String {
        format_logical_type(self.logical_type.as_ref())
    }

    /// Display form of the converted type.
    pub fn converted_type_display(&self) -> String {
        format_converted_type(self.converted_type)
    }
}

fn segments_match<S: AsRef<str>>(path: &[String], target: &[S]) -> bool {
    path.len() == target.len()
        && path
            .iter()
            .zip(target)
            .all(|(a, b)| a.eq_ignore_ascii_case(b.as_ref()))
}

/// Find the leaf whose reconstructed path equals `target` (case-insensitive).
///
/// When no path matches exactly, falls back to the first leaf whose bare
/// name equals the last segment of `target`, which keeps lenient or
/// synthetic schemas usable. First depth-first match wins in both passes.
pub fn resolve_leaf<S: AsRef<str>>(nodes: &[SchemaNode], target: &[S]) -> Option<SchemaLeaf> {
    let bare = target.last()?.as_ref();
    let mut fallback = None;

    for walked in SchemaWalker::new(nodes) {
        let Some(physical) = walked.node.physical_type.filter(|_| walked.node.is_leaf()) else {
            continue;
        };
        if segments_match(&walked.path, target) {
            return Some(SchemaLeaf::from_walked(&walked, physical));
        }
        if fallback.is_none() && walked.node.name.eq_ignore_ascii_case(bare) {
            fallback = Some(SchemaLeaf::from_walked(&walked, physical));
        }
    }
    fallback
}

/// [`resolve_leaf`] for a dotted path string.
pub fn resolve_dotted(nodes: &[SchemaNode], dotted: &str) -> Option<SchemaLeaf> {
    let segments: Vec<&str> = dotted.split('.').collect();
    resolve_leaf(nodes, &segments)
}

fn time_unit_name(unit: &TimeUnit) -> &'static str {
    match unit {
        TimeUnit::MILLIS => "MILLIS",
        TimeUnit::MICROS => "MICROS",
        TimeUnit::NANOS => "NANOS",
    }
}

/// Display form of a logical type; `-` when unset.
pub fn format_logical_type(logical: Option<&LogicalType>) -> String {
    let Some(logical) = logical else {
        return "-".to_string();
    };
    match logical {
        LogicalType::String => "STRING".to_string(),
        LogicalType::Map => "MAP".to_string(),
        LogicalType::List => "LIST".to_string(),
        LogicalType::Enum => "ENUM".to_string(),
        LogicalType::Decimal { scale, precision } => format!("DECIMAL({precision},{scale})"),
        LogicalType::Date => "DATE".to_string(),
        LogicalType::Time {
            is_adjusted_to_u_t_c,
            unit,
        } => format!("TIME({},{is_adjusted_to_u_t_c})", time_unit_name(unit)),
        LogicalType::Timestamp {
            is_adjusted_to_u_t_c,
            unit,
        } => format!("TIMESTAMP({},{is_adjusted_to_u_t_c})", time_unit_name(unit)),
        LogicalType::Integer {
            bit_width,
            is_signed,
        } => {
            let sign = if *is_signed { "signed" } else { "unsigned" };
            format!("INTEGER({bit_width},{sign})")
        }
        LogicalType::Unknown => "UNKNOWN".to_string(),
        LogicalType::Json => "JSON".to_string(),
        LogicalType::Bson => "BSON".to_string(),
        LogicalType::Uuid => "UUID".to_string(),
        LogicalType::Float16 => "FLOAT16".to_string(),
        other => format!("{other:?}").to_uppercase(),
    }
}

/// Display form of a converted type; `-` for `NONE`.
pub fn format_converted_type(converted: ConvertedType) -> String {
    match converted {
        ConvertedType::NONE => "-".to_string(),
        other => format!("{other:?}"),
    }
}

/// One row of a schema listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaEntry {
    /// Nesting depth, 0 for top-level fields.
    pub depth: usize,
    /// Field name.
    pub name: String,
    /// Dotted path.
    pub path: String,
    /// Repetition, `-` when unset.
    pub repetition: String,
    /// Physical type name, or `group`.
    pub physical_type: String,
    /// Formatted logical type.
    pub logical_type: String,
    /// Formatted converted type.
    pub converted_type: String,
    /// Child count for groups.
    pub num_children: Option<usize>,
}

/// List every named node of the schema in depth-first order.
pub fn schema_entries(nodes: &[SchemaNode]) -> Vec<SchemaEntry> {
    SchemaWalker::new(nodes)
        .map(|walked| {
            let node = walked.node;
            SchemaEntry {
                depth: walked.path.len().saturating_sub(1),
                name: node.name.clone(),
                path: walked.path.join("."),
                repetition: node
                    .repetition
                    .map_or_else(|| "-".to_string(), |r| format!("{r:?}")),
                physical_type: node
                    .physical_type
                    .map_or_else(|| "group".to_string(), |p| format!("{p:?}")),
                logical_type: format_logical_type(node.logical_type.as_ref()),
                converted_type: format_converted_type(node.converted_type),
                num_children: node.num_children,
            }
        })
        .collect()
}
