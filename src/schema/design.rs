//! Antenna design types: elements, roles and the evolvable parameter vector.

use serde::{Deserialize, Serialize};

/// Speed of light expressed so that `C_MHZ_METRES / f_MHz` yields metres.
pub const C_MHZ_METRES: f64 = 299.792458;

/// Role of an element along the boom.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum ElementRole {
    /// Parasitic element behind the driven element.
    Reflector,
    /// The fed element.
    Driven,
    /// Parasitic element ahead of the driven element.
    Director,
    /// Anything the design file did not label.
    #[default]
    #[serde(other)]
    Unknown,
}

/// A single conductor of the antenna.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Element {
    /// Element role.
    pub role: ElementRole,
    /// Full tip-to-tip length in metres.
    pub length: f64,
    /// Position along the boom in metres.
    pub position: f64,
    /// Conductor radius in metres.
    #[serde(default = "default_radius")]
    pub radius: f64,
    /// Number of wire segments used by the solver.
    #[serde(default = "default_segments")]
    pub segments: usize,
}

fn default_radius() -> f64 {
    0.003
}
fn default_segments() -> usize {
    21
}

impl Element {
    /// Create an element with default radius and segmentation.
    pub fn new(role: ElementRole, length: f64, position: f64) -> Self {
        Self {
            role,
            length,
            position,
            radius: default_radius(),
            segments: default_segments(),
        }
    }

    /// Half of the tip-to-tip length.
    #[inline]
    pub fn half_length(&self) -> f64 {
        self.length * 0.5
    }

    /// Index of the centre segment, where a feed point is placed.
    #[inline]
    pub fn centre_segment(&self) -> usize {
        self.segments / 2
    }
}

/// A complete antenna design: the baseline the optimizer starts from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AntennaDesign {
    /// Human readable name.
    #[serde(default)]
    pub name: String,
    /// Centre frequency in MHz.
    pub frequency_mhz: f64,
    /// Elements in boom order.
    pub elements: Vec<Element>,
}

impl AntennaDesign {
    /// Operating wavelength in metres.
    #[inline]
    pub fn wavelength(&self) -> f64 {
        C_MHZ_METRES / self.frequency_mhz
    }

    /// Index of the first driven element, if any.
    pub fn driven_index(&self) -> Option<usize> {
        self.elements
            .iter()
            .position(|e| e.role == ElementRole::Driven)
    }

    /// Current element lengths and inter-element spacings.
    pub fn parameters(&self) -> DesignParameters {
        DesignParameters {
            lengths: self.elements.iter().map(|e| e.length).collect(),
            spacings: self
                .elements
                .windows(2)
                .map(|pair| pair[1].position - pair[0].position)
                .collect(),
        }
    }

    /// A classic three element Yagi: reflector, driven element, one director.
    pub fn three_element(frequency_mhz: f64) -> Self {
        let lambda = C_MHZ_METRES / frequency_mhz;
        Self {
            name: format!("3-element Yagi @ {frequency_mhz} MHz"),
            frequency_mhz,
            elements: vec![
                Element::new(ElementRole::Reflector, 0.50 * lambda, 0.0),
                Element::new(ElementRole::Driven, 0.47 * lambda, 0.20 * lambda),
                Element::new(ElementRole::Director, 0.44 * lambda, 0.35 * lambda),
            ],
        }
    }
}

impl Default for AntennaDesign {
    fn default() -> Self {
        Self::three_element(144.0)
    }
}

/// The evolvable parameter vector of a design.
///
/// `lengths` has one entry per element; `spacings` holds the gap between
/// each pair of consecutive elements, so it is one shorter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct DesignParameters {
    /// Element lengths in metres.
    pub lengths: Vec<f64>,
    /// Gaps between consecutive elements in metres.
    pub spacings: Vec<f64>,
}

impl DesignParameters {
    /// Total number of genes.
    #[inline]
    pub fn len(&self) -> usize {
        self.lengths.len() + self.spacings.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.lengths.is_empty() && self.spacings.is_empty()
    }

    /// Iterate over every gene, lengths first.
    pub fn genes(&self) -> impl Iterator<Item = f64> + '_ {
        self.lengths.iter().chain(self.spacings.iter()).copied()
    }

    /// Mutable iteration over every gene, lengths first.
    pub fn genes_mut(&mut self) -> impl Iterator<Item = &mut f64> {
        self.lengths.iter_mut().chain(self.spacings.iter_mut())
    }

    /// True if every gene is a finite number.
    pub fn is_finite(&self) -> bool {
        self.genes().all(f64::is_finite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wavelength_at_two_metres() {
        let design = AntennaDesign::three_element(144.0);
        assert!((design.wavelength() - 2.0819).abs() < 1e-3);
    }

    #[test]
    fn test_parameters_from_positions() {
        let design = AntennaDesign::three_element(144.0);
        let params = design.parameters();
        let lambda = design.wavelength();
        assert_eq!(params.lengths.len(), 3);
        assert_eq!(params.spacings.len(), 2);
        assert!((params.spacings[0] - 0.20 * lambda).abs() < 1e-9);
        assert!((params.spacings[1] - 0.15 * lambda).abs() < 1e-9);
        assert_eq!(params.len(), 5);
    }

    #[test]
    fn test_unknown_role_deserializes() {
        let json = r#"{"role": "trap", "length": 1.0, "position": 0.0}"#;
        let element: Element = serde_json::from_str(json).unwrap();
        assert_eq!(element.role, ElementRole::Unknown);
        assert_eq!(element.segments, 21);
    }

    #[test]
    fn test_driven_index() {
        let design = AntennaDesign::default();
        assert_eq!(design.driven_index(), Some(1));
        assert_eq!(design.elements[1].centre_segment(), 10);
    }
}
