//! Array initializer encoding.
//!
//! An initializer can be emitted one store per element, as a single blob
//! copied into the array, or as a blob followed by stores for the elements
//! that are not compile-time constants.

use cinder_types::PrimitiveKind;
use smallvec::SmallVec;
use tracing::debug;

use crate::bound::{ArrayInitializer, ConstantValue, Expr, ExprKind, InitItem};
use crate::{Vec, vec};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ArrayStrategy {
    /// One store per non-default initializer.
    Element,
    /// One blob and one block-initialize call.
    Block,
    /// A blob with the non-constant slots zeroed, then one store per
    /// non-constant.
    Mixed,
}

/// Initializer counts across all dimensions.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct InitializerCounts {
    /// Initializers that are not the element type's default value.
    pub total: usize,
    /// The compile-time constants among `total`.
    pub constant: usize,
}

/// One initializer value and its position.
#[derive(Clone, Debug)]
pub struct Leaf<'a> {
    pub indices: SmallVec<[i32; 4]>,
    pub value: &'a Expr<'a>,
}

impl Leaf<'_> {
    pub fn constant(&self) -> Option<ConstantValue<'_>> {
        constant_of(self.value)
    }
}

/// Compile-time value of an initializer, if it has one.
pub fn constant_of<'a>(expr: &Expr<'a>) -> Option<ConstantValue<'a>> {
    match expr.kind {
        ExprKind::Literal(value) => Some(value),
        _ => expr.constant,
    }
}

/// The array already holds this value after allocation.
pub fn is_default(expr: &Expr<'_>) -> bool {
    matches!(expr.kind, ExprKind::Default) || constant_of(expr).is_some_and(|value| value.is_default())
}

/// Leaves in row-major order.
pub fn leaves<'a>(init: &ArrayInitializer<'a>) -> Vec<Leaf<'a>> {
    let mut out = Vec::new();
    let mut stack: Vec<(SmallVec<[i32; 4]>, &'a [InitItem<'a>], usize)> = vec![(SmallVec::new(), init.items, 0)];
    while let Some((prefix, items, next)) = stack.pop() {
        let Some(item) = items.get(next) else {
            continue;
        };
        let mut indices = prefix.clone();
        indices.push(next as i32);
        stack.push((prefix, items, next + 1));
        match item {
            InitItem::Value(value) => out.push(Leaf { indices, value }),
            InitItem::Nested(inner) => stack.push((indices, inner.items, 0)),
        }
    }
    out
}

pub fn count_initializers(leaves: &[Leaf<'_>]) -> InitializerCounts {
    leaves
        .iter()
        .filter(|leaf| !is_default(leaf.value))
        .fold(InitializerCounts::default(), |mut counts, leaf| {
            counts.total += 1;
            if leaf.constant().is_some() {
                counts.constant += 1;
            }
            counts
        })
}

pub fn choose_strategy(counts: InitializerCounts, element: Option<PrimitiveKind>) -> ArrayStrategy {
    let InitializerCounts { total, constant } = counts;
    let blittable = element.is_some_and(|kind| kind.is_blittable());
    if total <= 2 || !blittable {
        ArrayStrategy::Element
    } else if total == constant {
        ArrayStrategy::Block
    } else if constant >= usize::max(3, total / 3) {
        ArrayStrategy::Mixed
    } else {
        ArrayStrategy::Element
    }
}

/// Whether a blob can be exposed directly as a read-only byte view.
pub fn can_wrap_bytes(element: Option<PrimitiveKind>) -> bool {
    element.and_then(PrimitiveKind::byte_width) == Some(1)
}

/// Memory image of the initializer, with zeros in non-constant slots.
///
/// `None` when some constant has no fixed layout as `element`.
pub fn blob(leaves: &[Leaf<'_>], element: PrimitiveKind) -> Option<Vec<u8>> {
    let width = element.byte_width()? as usize;
    let mut bytes = Vec::with_capacity(leaves.len() * width);
    for leaf in leaves {
        match leaf.constant() {
            Some(value) => {
                let value = if value.kind() == Some(element) {
                    value
                } else {
                    value.convert(element)?
                };
                if !value.write_le(&mut bytes) {
                    return None;
                }
            }
            None => bytes.resize(bytes.len() + width, 0),
        }
    }
    Some(bytes)
}

/// Chosen encoding and, for blob strategies, the blob.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArrayPlan {
    pub strategy: ArrayStrategy,
    pub blob: Option<Vec<u8>>,
    pub counts: InitializerCounts,
}

pub fn plan(leaves: &[Leaf<'_>], element: Option<PrimitiveKind>) -> ArrayPlan {
    let counts = count_initializers(leaves);
    let mut strategy = choose_strategy(counts, element);
    let mut bytes = None;
    if strategy != ArrayStrategy::Element {
        bytes = element.and_then(|kind| blob(leaves, kind));
        if bytes.is_none() {
            strategy = ArrayStrategy::Element;
        }
    }
    debug!(
        total = counts.total,
        constant = counts.constant,
        ?strategy,
        "array initializer strategy"
    );
    ArrayPlan {
        strategy,
        blob: bytes,
        counts,
    }
}

#[cfg(test)]
#[path = "array_init_test.rs"]
mod array_init_test;
