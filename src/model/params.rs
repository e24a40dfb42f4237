//! Named model parameters and the collaborator-model contract.
//!
//! DMX bins live on a model as three parameters per bin:
//!
//! - `DMX_%04d`: the DM offset (fit)
//! - `DMXR1_%04d` / `DMXR2_%04d`: the MJD range the offset applies to
//!
//! Anything that can store such parameters implements [`ParameterStore`];
//! [`DmxModel`] is the in-crate implementation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::DmxError;

pub const DMX_VALUE_PREFIX: &str = "DMX_";
pub const DMX_R1_PREFIX: &str = "DMXR1_";
pub const DMX_R2_PREFIX: &str = "DMXR2_";

pub const DMX_VALUE_UNIT: &str = "pc cm^-3";
pub const DMX_RANGE_UNIT: &str = "d";

pub fn dmx_name(index: usize) -> String {
    format!("{DMX_VALUE_PREFIX}{index:04}")
}

pub fn dmxr1_name(index: usize) -> String {
    format!("{DMX_R1_PREFIX}{index:04}")
}

pub fn dmxr2_name(index: usize) -> String {
    format!("{DMX_R2_PREFIX}{index:04}")
}

/// A scalar model parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub value: f64,
    /// Fit uncertainty; `None` until a fit has run (or if the parameter is frozen).
    #[serde(default)]
    pub uncertainty: Option<f64>,
    /// Frozen parameters are held fixed by the fitter.
    #[serde(default)]
    pub frozen: bool,
    #[serde(default)]
    pub unit: String,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: f64, unit: impl Into<String>, frozen: bool) -> Self {
        Self {
            name: name.into(),
            value,
            uncertainty: None,
            frozen,
            unit: unit.into(),
        }
    }
}

/// What the segmentation and summary code needs from a timing model.
pub trait ParameterStore {
    /// Add a new parameter. Adding a name that already exists is an error.
    fn add_param(&mut self, param: Parameter) -> Result<(), DmxError>;

    fn param(&self, name: &str) -> Option<&Parameter>;

    fn param_mut(&mut self, name: &str) -> Option<&mut Parameter>;

    fn param_names(&self) -> Vec<String>;

    /// Check internal consistency; fails loudly on a malformed parameter set.
    fn validate(&self) -> Result<(), DmxError>;
}

/// One DMX bin as found on a model: its index and the exact suffix used in
/// its parameter names (`"0001"` for `DMX_0001`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DmxEpoch {
    pub index: usize,
    pub suffix: String,
}

impl DmxEpoch {
    pub fn value_name(&self) -> String {
        format!("{DMX_VALUE_PREFIX}{}", self.suffix)
    }

    pub fn r1_name(&self) -> String {
        format!("{DMX_R1_PREFIX}{}", self.suffix)
    }

    pub fn r2_name(&self) -> String {
        format!("{DMX_R2_PREFIX}{}", self.suffix)
    }
}

/// All `DMX_<n>` parameters on a model, ascending by index.
pub fn dmx_epochs<M: ParameterStore + ?Sized>(model: &M) -> Vec<DmxEpoch> {
    let mut out: Vec<DmxEpoch> = model
        .param_names()
        .iter()
        .filter(|name| name.starts_with(DMX_VALUE_PREFIX))
        .filter_map(|name| split_prefixed_name(name).ok())
        .filter(|(prefix, _, _)| prefix == DMX_VALUE_PREFIX)
        .map(|(_, suffix, index)| DmxEpoch { index, suffix })
        .collect();
    out.sort_by(|a, b| a.index.cmp(&b.index).then_with(|| a.suffix.cmp(&b.suffix)));
    out
}

/// Split a prefixed parameter name into `(prefix, index_text, index)`.
///
/// Accepted shapes:
///
/// - letters, digits, letters, then the index (`T2EFAC17`)
/// - letters then the index (`F12`)
/// - alphanumerics and an underscore, then the index (`DMXR1_0002`)
pub fn split_prefixed_name(name: &str) -> Result<(String, String, usize), DmxError> {
    let digits = name.bytes().rev().take_while(u8::is_ascii_digit).count();
    let (prefix, index_part) = name.split_at(name.len() - digits);

    if index_part.is_empty() || !prefix_shape_ok(prefix) {
        return Err(DmxError::Prefix(name.to_string()));
    }
    let index = index_part
        .parse::<usize>()
        .map_err(|_| DmxError::Prefix(name.to_string()))?;

    Ok((prefix.to_string(), index_part.to_string(), index))
}

fn prefix_shape_ok(prefix: &str) -> bool {
    let bytes = prefix.as_bytes();
    let Some((&last, body)) = bytes.split_last() else {
        return false;
    };

    if last == b'_' {
        return !body.is_empty() && body.iter().all(u8::is_ascii_alphanumeric);
    }
    if !last.is_ascii_alphabetic() {
        return false;
    }
    if bytes.iter().all(u8::is_ascii_alphabetic) {
        return true;
    }

    // letters* digits+ letters+
    let lead = bytes.iter().take_while(|b| b.is_ascii_alphabetic()).count();
    let mid = bytes[lead..].iter().take_while(|b| b.is_ascii_digit()).count();
    mid > 0 && bytes[lead + mid..].iter().all(u8::is_ascii_alphabetic)
}

/// In-memory parameter set for DMX work.
///
/// [`DmxModel::new`] seeds the first bin's slot (`DMX_0001` and its range),
/// which is the layout bin installation expects.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DmxModel {
    params: BTreeMap<String, Parameter>,
}

impl DmxModel {
    pub fn new() -> Self {
        let mut params = BTreeMap::new();
        for p in [
            Parameter::new(dmx_name(1), 0.0, DMX_VALUE_UNIT, true),
            Parameter::new(dmxr1_name(1), f64::NAN, DMX_RANGE_UNIT, true),
            Parameter::new(dmxr2_name(1), f64::NAN, DMX_RANGE_UNIT, true),
        ] {
            params.insert(p.name.clone(), p);
        }
        Self { params }
    }

    /// Build a model from an explicit parameter list (e.g. read back from a fit).
    pub fn from_params(params: impl IntoIterator<Item = Parameter>) -> Result<Self, DmxError> {
        let mut model = Self::default();
        for p in params {
            model.add_param(p)?;
        }
        Ok(model)
    }

    pub fn params(&self) -> impl Iterator<Item = &Parameter> {
        self.params.values()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

impl ParameterStore for DmxModel {
    fn add_param(&mut self, param: Parameter) -> Result<(), DmxError> {
        if self.params.contains_key(&param.name) {
            return Err(DmxError::consistency(format!(
                "Parameter {} already present in model.",
                param.name
            )));
        }
        self.params.insert(param.name.clone(), param);
        Ok(())
    }

    fn param(&self, name: &str) -> Option<&Parameter> {
        self.params.get(name)
    }

    fn param_mut(&mut self, name: &str) -> Option<&mut Parameter> {
        self.params.get_mut(name)
    }

    fn param_names(&self) -> Vec<String> {
        self.params.keys().cloned().collect()
    }

    fn validate(&self) -> Result<(), DmxError> {
        let epochs = dmx_epochs(self);

        for pair in epochs.windows(2) {
            if pair[0].index == pair[1].index {
                return Err(DmxError::consistency(format!(
                    "Duplicate DMX index {} ({} and {}).",
                    pair[0].index,
                    pair[0].value_name(),
                    pair[1].value_name()
                )));
            }
        }

        for epoch in &epochs {
            let r1 = self.param(&epoch.r1_name()).ok_or_else(|| {
                DmxError::consistency(format!("{} has no {}.", epoch.value_name(), epoch.r1_name()))
            })?;
            let r2 = self.param(&epoch.r2_name()).ok_or_else(|| {
                DmxError::consistency(format!("{} has no {}.", epoch.value_name(), epoch.r2_name()))
            })?;
            if r1.value.is_finite() && r2.value.is_finite() && r1.value > r2.value {
                return Err(DmxError::consistency(format!(
                    "{} starts after it ends: {} > {}.",
                    epoch.value_name(),
                    r1.value,
                    r2.value
                )));
            }
        }

        for name in self.params.keys() {
            for prefix in [DMX_R1_PREFIX, DMX_R2_PREFIX] {
                if let Some(suffix) = name.strip_prefix(prefix) {
                    let value_name = format!("{DMX_VALUE_PREFIX}{suffix}");
                    if !self.params.contains_key(&value_name) {
                        return Err(DmxError::consistency(format!(
                            "{name} has no matching {value_name}."
                        )));
                    }
                }
            }
        }

        Ok(())
    }
}
