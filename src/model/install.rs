//! Install a segmentation onto a model as DMX parameters.

use tracing::info;

use crate::domain::Segmentation;
use crate::error::DmxError;
use crate::model::params::{
    DMX_RANGE_UNIT, DMX_VALUE_UNIT, Parameter, ParameterStore, dmx_name, dmxr1_name, dmxr2_name,
};

/// Write one `DMX_i` / `DMXR1_i` / `DMXR2_i` triple per bin, `i` starting at 1.
///
/// The first bin reuses the slot already present on the model; every later bin
/// is added. Each offset starts at `0` and unfrozen. The model is validated
/// last, and a validation failure is returned as-is.
pub fn install_bins<M: ParameterStore + ?Sized>(
    model: &mut M,
    segmentation: &Segmentation,
) -> Result<(), DmxError> {
    for (ii, (r1, r2)) in segmentation.boundaries().into_iter().enumerate() {
        let index = ii + 1;
        if index == 1 {
            set_existing(model, &dmx_name(index), 0.0, Some(false))?;
            set_existing(model, &dmxr1_name(index), r1, None)?;
            set_existing(model, &dmxr2_name(index), r2, None)?;
        } else {
            model.add_param(Parameter::new(dmx_name(index), 0.0, DMX_VALUE_UNIT, false))?;
            model.add_param(Parameter::new(dmxr1_name(index), r1, DMX_RANGE_UNIT, true))?;
            model.add_param(Parameter::new(dmxr2_name(index), r2, DMX_RANGE_UNIT, true))?;
        }
    }

    model.validate()?;
    info!(bins = segmentation.bins.len(), "installed DMX parameters");
    Ok(())
}

fn set_existing<M: ParameterStore + ?Sized>(
    model: &mut M,
    name: &str,
    value: f64,
    frozen: Option<bool>,
) -> Result<(), DmxError> {
    let param = model.param_mut(name).ok_or_else(|| {
        DmxError::consistency(format!("Model has no {name} slot to install the first bin into."))
    })?;
    param.value = value;
    param.uncertainty = None;
    if let Some(frozen) = frozen {
        param.frozen = frozen;
    }
    Ok(())
}
