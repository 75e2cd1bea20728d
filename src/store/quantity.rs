//! A single node of the physics graph.
use super::types::{Kind, QuantityId, QuantityMetadata, Unit};
use crate::compute::array::Array;
use crate::compute::updater::Updater;
use crate::error::InputError;
use smallvec::{smallvec, SmallVec};

/// Per-component multipliers; nine covers every tensor without spilling.
pub type Multiplier = SmallVec<[f64; 9]>;

/// The data a quantity holds. Updaters write their result here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Storage {
    pub multiplier: Multiplier,
    /// FIELD: the computed array. MASK: the mask, `None` meaning uniform 1.
    /// VALUE: always `None`.
    pub array: Option<Array>,
}

impl Storage {
    pub fn ncomp(&self) -> usize { self.multiplier.len() }

    /// True when every component carries the same multiplier.
    pub fn is_uniform(&self) -> bool {
        self.multiplier.windows(2).all(|w| w[0] == w[1])
    }
}

#[derive(Debug)]
pub struct Quantity {
    pub(crate) meta: QuantityMetadata,
    pub(crate) ncomp: usize,
    pub(crate) kind: Kind,
    pub(crate) size3d: Option<[usize; 3]>,
    pub(crate) storage: Storage,
    pub(crate) valid: bool,
    /// Inputs must be assigned at least once before they can be read.
    pub(crate) assigned: bool,
    pub(crate) updater: Option<Updater>,
    pub(crate) parents: SmallVec<[QuantityId; 4]>,
    pub(crate) children: SmallVec<[QuantityId; 4]>,
    pub(crate) update_count: u64,
}

impl Quantity {
    pub(crate) fn new(meta: QuantityMetadata, ncomp: usize, kind: Kind, size3d: Option<[usize; 3]>) -> Self {
        let (multiplier, array): (Multiplier, _) = match kind {
            Kind::Value => (smallvec![0.0; ncomp], None),
            Kind::Mask => (smallvec![1.0; ncomp], None),
            Kind::Field => (smallvec![1.0; ncomp], size3d.map(|s| Array::new(ncomp, s))),
        };
        Self {
            meta,
            ncomp,
            kind,
            size3d,
            storage: Storage { multiplier, array },
            valid: false,
            assigned: false,
            updater: None,
            parents: SmallVec::new(),
            children: SmallVec::new(),
            update_count: 0,
        }
    }

    pub fn name(&self) -> &str { &self.meta.name }
    pub fn meta(&self) -> &QuantityMetadata { &self.meta }
    pub fn unit(&self) -> &Unit { &self.meta.unit }
    pub fn ncomp(&self) -> usize { self.ncomp }
    pub fn kind(&self) -> Kind { self.kind }
    pub fn size3d(&self) -> Option<[usize; 3]> { self.size3d }
    pub fn is_valid(&self) -> bool { self.valid }
    pub fn parents(&self) -> &[QuantityId] { &self.parents }
    pub fn children(&self) -> &[QuantityId] { &self.children }
    pub fn updater(&self) -> Option<&Updater> { self.updater.as_ref() }
    /// Number of times the updater has run.
    pub fn update_count(&self) -> u64 { self.update_count }

    /// Raw storage, without triggering an update.
    pub fn storage(&self) -> &Storage { &self.storage }

    /// Raw multiplier, without triggering an update.
    pub fn multiplier(&self) -> &[f64] { &self.storage.multiplier }

    pub fn check_kind(&self, allowed: &[Kind]) -> Result<(), InputError> {
        if allowed.contains(&self.kind) {
            return Ok(());
        }
        Err(InputError::KindMismatch {
            name: self.meta.name.clone(),
            expected: allowed.iter().map(|k| k.to_string()).collect::<Vec<_>>().join(", "),
            actual: self.kind.to_string(),
        })
    }

    pub fn check_comp(&self, ncomp: usize) -> Result<(), InputError> {
        if self.ncomp == ncomp {
            Ok(())
        } else {
            Err(InputError::ComponentMismatch { name: self.meta.name.clone(), expected: ncomp, actual: self.ncomp })
        }
    }

    /// Multiplier times array (or mask) as a fresh array.
    pub(crate) fn effective_buffer(&self) -> Result<Array, InputError> {
        self.check_kind(&[Kind::Mask, Kind::Field])?;
        let mul = &self.storage.multiplier;
        match (&self.storage.array, self.size3d) {
            (Some(a), _) => {
                let mut out = a.clone();
                for (c, &m) in mul.iter().enumerate() {
                    if m != 1.0 {
                        out.scale_component(c, m);
                    }
                }
                Ok(out)
            }
            (None, Some(size)) => Ok(Array::uniform(size, mul)),
            (None, None) => Err(InputError::GeometryNotSet { what: "grid size" }),
        }
    }

    pub(crate) fn updater_name(&self) -> &str {
        self.updater.as_ref().map_or("input", |u| u.name())
    }
}
