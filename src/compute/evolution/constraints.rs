//! Per-parameter valid ranges derived from the baseline design.

use serde::{Deserialize, Serialize};

use crate::schema::{AntennaDesign, DesignParameters, ElementRole};

/// Length range by element role, as fractions of a wavelength.
pub fn length_range(role: ElementRole) -> (f64, f64) {
    match role {
        ElementRole::Reflector => (0.48, 0.55),
        ElementRole::Driven => (0.44, 0.51),
        ElementRole::Director => (0.38, 0.48),
        ElementRole::Unknown => (0.40, 0.50),
    }
}

/// Spacing range between adjacent elements, as fractions of a wavelength.
pub const SPACING_RANGE: (f64, f64) = (0.10, 0.40);

/// Valid range of a single parameter.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Constraint {
    pub min: f64,
    pub max: f64,
    /// Baseline value, always within `[min, max]`.
    pub current: f64,
}

impl Constraint {
    /// Build a constraint, clamping `current` into range.
    pub fn new(min: f64, max: f64, current: f64) -> Self {
        Self {
            min,
            max,
            current: clamp_finite(current, min, max),
        }
    }

    /// Width of the range.
    #[inline]
    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    #[inline]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Clamp `value` into range; non-finite values map to `current`.
    #[inline]
    pub fn clamp(&self, value: f64) -> f64 {
        if value.is_finite() {
            value.clamp(self.min, self.max)
        } else {
            self.current
        }
    }
}

fn clamp_finite(value: f64, min: f64, max: f64) -> f64 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        (min + max) * 0.5
    }
}

/// Constraints for every slot of a [`DesignParameters`] vector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParameterConstraints {
    pub lengths: Vec<Constraint>,
    pub spacings: Vec<Constraint>,
}

impl ParameterConstraints {
    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.lengths.len() + self.spacings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lengths.is_empty() && self.spacings.is_empty()
    }

    /// Iterate over every constraint, lengths first, matching gene order.
    pub fn iter(&self) -> impl Iterator<Item = &Constraint> + '_ {
        self.lengths.iter().chain(self.spacings.iter())
    }

    /// The baseline parameter vector (every `current`).
    pub fn baseline(&self) -> DesignParameters {
        DesignParameters {
            lengths: self.lengths.iter().map(|c| c.current).collect(),
            spacings: self.spacings.iter().map(|c| c.current).collect(),
        }
    }

    /// True if `params` has the right shape and every gene is in range.
    pub fn contains(&self, params: &DesignParameters) -> bool {
        params.lengths.len() == self.lengths.len()
            && params.spacings.len() == self.spacings.len()
            && self.iter().zip(params.genes()).all(|(c, v)| c.contains(v))
    }
}

/// Baseline design preconditions.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum DesignError {
    #[error("Design needs at least 2 elements, found {0}")]
    TooFewElements(usize),
    #[error("Design has no driven element")]
    NoDrivenElement,
    #[error("Invalid frequency: {0} MHz")]
    InvalidFrequency(f64),
}

/// Derive per-parameter ranges from a baseline design.
pub fn derive_constraints(design: &AntennaDesign) -> Result<ParameterConstraints, DesignError> {
    if design.elements.len() < 2 {
        return Err(DesignError::TooFewElements(design.elements.len()));
    }
    if design.driven_index().is_none() {
        return Err(DesignError::NoDrivenElement);
    }
    if !(design.frequency_mhz.is_finite() && design.frequency_mhz > 0.0) {
        return Err(DesignError::InvalidFrequency(design.frequency_mhz));
    }

    let lambda = design.wavelength();

    let lengths = design
        .elements
        .iter()
        .enumerate()
        .map(|(i, element)| {
            let (lo, hi) = length_range(element.role);
            let constraint = Constraint::new(lo * lambda, hi * lambda, element.length);
            if constraint.current != element.length {
                log::warn!(
                    "Element {i} ({:?}) length {:.4} m outside [{:.4}, {:.4}], clamped",
                    element.role,
                    element.length,
                    constraint.min,
                    constraint.max
                );
            }
            constraint
        })
        .collect();

    let spacings = design
        .elements
        .windows(2)
        .enumerate()
        .map(|(i, pair)| {
            let gap = pair[1].position - pair[0].position;
            let constraint =
                Constraint::new(SPACING_RANGE.0 * lambda, SPACING_RANGE.1 * lambda, gap);
            if constraint.current != gap {
                log::warn!(
                    "Spacing {i} ({gap:.4} m) outside [{:.4}, {:.4}], clamped",
                    constraint.min,
                    constraint.max
                );
            }
            constraint
        })
        .collect();

    Ok(ParameterConstraints { lengths, spacings })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Element;

    #[test]
    fn test_role_ranges() {
        let design = AntennaDesign::three_element(144.0);
        let lambda = design.wavelength();
        let constraints = derive_constraints(&design).unwrap();

        assert_eq!(constraints.lengths.len(), 3);
        assert_eq!(constraints.spacings.len(), 2);
        assert!((constraints.lengths[0].min - 0.48 * lambda).abs() < 1e-9);
        assert!((constraints.lengths[1].max - 0.51 * lambda).abs() < 1e-9);
        assert!((constraints.lengths[2].min - 0.38 * lambda).abs() < 1e-9);
        assert!((constraints.spacings[1].max - 0.40 * lambda).abs() < 1e-9);
        assert_eq!(constraints.baseline(), design.parameters());
        assert!(constraints.contains(&design.parameters()));
    }

    #[test]
    fn test_unknown_role_fallback() {
        assert_eq!(length_range(ElementRole::Unknown), (0.40, 0.50));
    }

    #[test]
    fn test_out_of_range_baseline_is_clamped() {
        let mut design = AntennaDesign::three_element(144.0);
        design.elements[2].length = 10.0;
        let constraints = derive_constraints(&design).unwrap();
        let director = constraints.lengths[2];
        assert_eq!(director.current, director.max);
    }

    #[test]
    fn test_too_few_elements() {
        let design = AntennaDesign {
            name: String::new(),
            frequency_mhz: 144.0,
            elements: vec![Element::new(ElementRole::Driven, 1.0, 0.0)],
        };
        assert_eq!(
            derive_constraints(&design),
            Err(DesignError::TooFewElements(1))
        );
    }

    #[test]
    fn test_no_driven_element() {
        let mut design = AntennaDesign::three_element(144.0);
        design.elements[1].role = ElementRole::Director;
        assert_eq!(
            derive_constraints(&design),
            Err(DesignError::NoDrivenElement)
        );
    }

    #[test]
    fn test_bad_frequency() {
        let mut design = AntennaDesign::three_element(144.0);
        design.frequency_mhz = 0.0;
        assert!(matches!(
            derive_constraints(&design),
            Err(DesignError::InvalidFrequency(_))
        ));
    }
}
