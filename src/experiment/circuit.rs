//! Battery driving three resistors in parallel.
//!
//! Time plays no part: every running frame recomputes the branch currents
//! from the parameters and pushes them into arrows and labels.
//!
//! ```text
//!          ┌──[ R1 ]──┐
//!   (+)────┼──[ R2 ]──┼────(−)
//!          └──[ R3 ]──┘
//! ```

use crate::error::SceneError;
use crate::experiment::params::{ParameterSet, ParameterSpec};
use crate::experiment::{
    add_lights, Experiment, ExperimentDescriptor, ExperimentKind, Readout, SetupOptions,
};
use crate::scene::graph::{NodeId, SceneGraph, SceneId, Transform};
use crate::scene::resources::{Geometry, Material};
use glam::Vec3;
use std::f32::consts::{FRAC_PI_2, PI};

/// Standard resistor colour code, indexed by digit.
pub const BAND_COLORS: [u32; 10] = [
    0x000000, 0x8b4513, 0xff0000, 0xffa500, 0xffff00, 0x008000, 0x0000ff, 0x8a2be2, 0x808080,
    0xffffff,
];
pub const MULTIPLIER_COLOR: u32 = 0x000000;
pub const TOLERANCE_COLOR: u32 = 0xffd700;

const WIRE_HEIGHT: f32 = 0.75;
const RESISTOR_Z: [f32; 3] = [-3.0, 0.0, 3.0];
const BAND_X: [f32; 4] = [-0.7, -0.4, -0.1, 0.7];
const LABEL_Z: [f32; 3] = [-4.5, -1.5, 1.5];
const IDLE_CURRENT_TEXT: &str = "0.0A";

/// Wire runs as (start, end) on the board plane, x/z.
const WIRES: [((f32, f32), (f32, f32)); 12] = [
    ((-6.0, -3.0), (-2.0, -3.0)),
    ((-2.0, 0.0), (-2.0, 0.0)),
    ((-2.0, 3.0), (-2.0, 3.0)),
    ((-2.0, -3.0), (-2.0, 3.0)),
    ((-2.0, -3.0), (-1.0, -3.0)),
    ((-2.0, 0.0), (-1.0, 0.0)),
    ((-2.0, 3.0), (-1.0, 3.0)),
    ((1.0, -3.0), (2.0, -3.0)),
    ((1.0, 0.0), (2.0, 0.0)),
    ((1.0, 3.0), (2.0, 3.0)),
    ((2.0, -3.0), (2.0, 3.0)),
    ((2.0, 0.0), (6.0, 0.0)),
];

/// Steady-state values of the parallel network.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircuitReading {
    pub voltage: f64,
    pub branch_currents: [f64; 3],
    pub total_resistance: f64,
    pub total_current: f64,
}

/// Solve the network for `voltage` across `resistances`.
pub fn analyze(voltage: f64, resistances: [f64; 3]) -> CircuitReading {
    let conductance: f64 = resistances.iter().map(|r| 1.0 / r).sum();
    let total_resistance = 1.0 / conductance;
    CircuitReading {
        voltage,
        branch_currents: resistances.map(|r| voltage / r),
        total_resistance,
        total_current: voltage / total_resistance,
    }
}

/// Band colours for a resistance: tens digit, units digit, multiplier, tolerance.
///
/// Values are rounded to whole ohms; a tens digit past the palette (100 Ω)
/// renders black.
pub fn resistor_bands(ohms: f64) -> [u32; 4] {
    let value = ohms.round().max(0.0) as usize;
    let digit = |d: usize| BAND_COLORS.get(d).copied().unwrap_or(0x000000);
    [
        digit(value / 10),
        digit(value % 10),
        MULTIPLIER_COLOR,
        TOLERANCE_COLOR,
    ]
}

/// `"12V"`, `"9.5V"`: shortest decimal form of the voltage.
pub fn format_voltage(voltage: f64) -> String {
    format!("{}V", voltage)
}

pub fn format_current(amps: f64) -> String {
    format!("{:.2}A", amps)
}

fn params_from_set(params: &ParameterSet) -> (f64, [f64; 3]) {
    (
        params.get_or("voltage", 12.0),
        [
            params.get_or("resistance1", 10.0),
            params.get_or("resistance2", 20.0),
            params.get_or("resistance3", 30.0),
        ],
    )
}

#[derive(Debug, Clone, Copy)]
pub struct ResistorNodes {
    pub group: NodeId,
    pub body: NodeId,
    pub bands: [NodeId; 4],
}

#[derive(Debug)]
pub struct CircuitObjects {
    pub scene: SceneId,
    pub board: NodeId,
    pub battery: NodeId,
    pub resistors: [ResistorNodes; 3],
    pub wires: Vec<NodeId>,
    /// Total-current arrow first, then one per branch
    pub current_arrows: [NodeId; 4],
    pub voltage_label: NodeId,
    pub current_labels: [NodeId; 3],
    pub last_reading: Option<CircuitReading>,
}

fn add_resistor(
    scene: &mut SceneGraph,
    index: usize,
    z: f32,
    ohms: f64,
) -> Result<ResistorNodes, SceneError> {
    let group = scene.add_group(
        None,
        &format!("resistor-{}", index + 1),
        Transform::at(Vec3::new(0.0, WIRE_HEIGHT, z)),
    )?;
    let body = scene.add_mesh(
        Some(group),
        "body",
        Geometry::Box {
            width: 2.0,
            height: 0.5,
            depth: 0.5,
        },
        Material::standard(0xa0522d),
        Transform::default(),
    )?;

    let colors = resistor_bands(ohms);
    let mut bands = [body; 4];
    for (i, band) in bands.iter_mut().enumerate() {
        *band = scene.add_mesh(
            Some(group),
            "band",
            Geometry::Box {
                width: 0.1,
                height: 0.55,
                depth: 0.55,
            },
            Material::standard(colors[i]),
            Transform::at(Vec3::new(BAND_X[i], 0.0, 0.0)),
        )?;
    }
    Ok(ResistorNodes { group, body, bands })
}

fn label_transform(position: Vec3) -> Transform {
    Transform::at(position).with_rotation(Vec3::new(-FRAC_PI_2, 0.0, PI))
}

pub struct Circuit;

impl Experiment for Circuit {
    type Objects = CircuitObjects;

    fn descriptor(&self) -> ExperimentDescriptor {
        ExperimentDescriptor {
            id: ExperimentKind::Circuit.id().to_string(),
            name: "Electric Circuit".to_string(),
            description: "Analyze current and voltage in a simple circuit".to_string(),
            kind: ExperimentKind::Circuit,
            control_params: vec![
                ParameterSpec::new("voltage", "Battery Voltage", 1.0, 24.0, 12.0, "V"),
                ParameterSpec::new("resistance1", "Resistor 1", 1.0, 100.0, 10.0, "Ω").divisor(),
                ParameterSpec::new("resistance2", "Resistor 2", 1.0, 100.0, 20.0, "Ω").divisor(),
                ParameterSpec::new("resistance3", "Resistor 3", 1.0, 100.0, 30.0, "Ω").divisor(),
            ],
        }
    }

    fn setup(
        &self,
        scene: &mut SceneGraph,
        params: &ParameterSet,
        _options: &SetupOptions,
    ) -> Result<CircuitObjects, SceneError> {
        let (voltage, resistances) = params_from_set(params);

        let board = scene.add_mesh(
            None,
            "board",
            Geometry::Plane {
                width: 20.0,
                height: 15.0,
            },
            Material::standard(0x333333)
                .with_roughness(0.8)
                .with_metalness(0.2),
            Transform::default().with_rotation(Vec3::new(-FRAC_PI_2, 0.0, 0.0)),
        )?;
        let battery = scene.add_mesh(
            None,
            "battery",
            Geometry::Box {
                width: 3.0,
                height: 1.0,
                depth: 1.5,
            },
            Material::standard(0xff4500),
            Transform::at(Vec3::new(-6.0, WIRE_HEIGHT, 0.0)),
        )?;

        let resistors = [
            add_resistor(scene, 0, RESISTOR_Z[0], resistances[0])?,
            add_resistor(scene, 1, RESISTOR_Z[1], resistances[1])?,
            add_resistor(scene, 2, RESISTOR_Z[2], resistances[2])?,
        ];

        let mut wires = Vec::with_capacity(WIRES.len());
        for ((x1, z1), (x2, z2)) in WIRES {
            wires.push(scene.add_line(
                None,
                "wire",
                vec![
                    Vec3::new(x1, WIRE_HEIGHT, z1),
                    Vec3::new(x2, WIRE_HEIGHT, z2),
                ],
                Material::line(0xffffff),
            )?);
        }

        let arrow_origins = [
            Vec3::new(-4.0, WIRE_HEIGHT, -3.0),
            Vec3::new(-0.5, WIRE_HEIGHT, RESISTOR_Z[0]),
            Vec3::new(-0.5, WIRE_HEIGHT, RESISTOR_Z[1]),
            Vec3::new(-0.5, WIRE_HEIGHT, RESISTOR_Z[2]),
        ];
        let mut current_arrows = [board; 4];
        for (slot, origin) in current_arrows.iter_mut().zip(arrow_origins) {
            *slot = scene.add_arrow(None, "current", origin, Vec3::X, 1.0, 0xffff00, 0.3, 0.2)?;
        }

        add_lights(scene, 0.7, Vec3::new(5.0, 10.0, 5.0))?;

        let voltage_label = scene.add_label(
            None,
            "voltage",
            &format_voltage(voltage),
            label_transform(Vec3::new(-6.0, 0.1, -2.0)),
        )?;
        let mut current_labels = [voltage_label; 3];
        for (slot, z) in current_labels.iter_mut().zip(LABEL_Z) {
            *slot = scene.add_label(
                None,
                "current",
                IDLE_CURRENT_TEXT,
                label_transform(Vec3::new(0.0, 0.1, z)),
            )?;
        }

        Ok(CircuitObjects {
            scene: scene.id(),
            board,
            battery,
            resistors,
            wires,
            current_arrows,
            voltage_label,
            current_labels,
            last_reading: None,
        })
    }

    fn simulate(
        &self,
        objects: &mut CircuitObjects,
        scene: &mut SceneGraph,
        params: &ParameterSet,
        _time: f64,
        running: bool,
        _reset_trail: bool,
    ) -> Result<bool, SceneError> {
        if !running {
            return Ok(false);
        }

        let (voltage, resistances) = params_from_set(params);
        let reading = analyze(voltage, resistances);

        for (i, current) in reading.branch_currents.iter().enumerate() {
            scene.set_arrow(
                objects.current_arrows[i + 1],
                None,
                Some((0.5 + current / 10.0) as f32),
            )?;
            scene.set_label_text(objects.current_labels[i], &format_current(*current))?;
        }
        scene.set_label_text(objects.voltage_label, &format_voltage(voltage))?;

        if objects.last_reading != Some(reading) {
            log::trace!(
                "Circuit: Rt = {:.3} Ω, It = {:.3} A",
                reading.total_resistance,
                reading.total_current
            );
        }
        objects.last_reading = Some(reading);
        Ok(false)
    }

    fn reset(
        &self,
        objects: &mut CircuitObjects,
        scene: &mut SceneGraph,
        params: &ParameterSet,
    ) -> Result<(), SceneError> {
        let (voltage, resistances) = params_from_set(params);

        scene.set_label_text(objects.voltage_label, &format_voltage(voltage))?;
        for label in objects.current_labels {
            scene.set_label_text(label, IDLE_CURRENT_TEXT)?;
        }
        for arrow in objects.current_arrows {
            scene.set_arrow(arrow, None, Some(1.0))?;
        }
        for (resistor, ohms) in objects.resistors.iter().zip(resistances) {
            for (band, color) in resistor.bands.iter().zip(resistor_bands(ohms)) {
                scene.set_color(*band, color)?;
            }
        }
        objects.last_reading = None;
        Ok(())
    }

    fn readouts(&self, _objects: &CircuitObjects, params: &ParameterSet) -> Vec<Readout> {
        let (voltage, resistances) = params_from_set(params);
        let reading = analyze(voltage, resistances);
        vec![
            Readout::new("voltage", voltage, "V"),
            Readout::new("current1", reading.branch_currents[0], "A"),
            Readout::new("current2", reading.branch_currents[1], "A"),
            Readout::new("current3", reading.branch_currents[2], "A"),
            Readout::new("total_resistance", reading.total_resistance, "Ω"),
            Readout::new("total_current", reading.total_current, "A"),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn setup(params: &ParameterSet) -> (SceneGraph, CircuitObjects) {
        let mut scene = SceneGraph::new();
        let objects = Circuit
            .setup(&mut scene, params, &SetupOptions::default())
            .unwrap();
        (scene, objects)
    }

    #[test]
    fn default_network() {
        let reading = analyze(12.0, [10.0, 20.0, 30.0]);
        assert_relative_eq!(reading.branch_currents[0], 1.2);
        assert_relative_eq!(reading.branch_currents[1], 0.6);
        assert_relative_eq!(reading.branch_currents[2], 0.4);
        assert_relative_eq!(reading.total_resistance, 5.4545, epsilon = 1e-4);
        assert_relative_eq!(reading.total_current, 2.2, epsilon = 1e-9);
    }

    #[test]
    fn simulate_updates_arrows_and_labels() {
        let params = Circuit.descriptor().default_params();
        let (mut scene, mut objects) = setup(&params);

        let stop = Circuit
            .simulate(&mut objects, &mut scene, &params, 3.0, true, false)
            .unwrap();
        assert!(!stop);

        let labels: Vec<_> = objects
            .current_labels
            .iter()
            .map(|l| scene.label_text(*l).unwrap().to_string())
            .collect();
        assert_eq!(labels, vec!["1.20A", "0.60A", "0.40A"]);
        assert_eq!(scene.label_text(objects.voltage_label).unwrap(), "12V");

        let (_, len) = scene.arrow(objects.current_arrows[1]).unwrap();
        assert_relative_eq!(len, 0.62, epsilon = 1e-6);
        let (_, total) = scene.arrow(objects.current_arrows[0]).unwrap();
        assert_relative_eq!(total, 1.0);
    }

    #[test]
    fn reset_restores_idle_display_and_recolours_bands() {
        let params = Circuit.descriptor().default_params();
        let (mut scene, mut objects) = setup(&params);
        Circuit
            .simulate(&mut objects, &mut scene, &params, 0.0, true, false)
            .unwrap();

        let mut edited = params.clone();
        edited.set("voltage", 9.5);
        edited.set("resistance2", 47.0);
        Circuit.reset(&mut objects, &mut scene, &edited).unwrap();
        Circuit.reset(&mut objects, &mut scene, &edited).unwrap();

        for label in objects.current_labels {
            assert_eq!(scene.label_text(label).unwrap(), "0.0A");
        }
        for arrow in objects.current_arrows {
            assert_relative_eq!(scene.arrow(arrow).unwrap().1, 1.0);
        }
        assert_eq!(scene.label_text(objects.voltage_label).unwrap(), "9.5V");
        let band_colors: Vec<u32> = objects.resistors[1]
            .bands
            .iter()
            .map(|b| scene.color(*b).unwrap())
            .collect();
        assert_eq!(band_colors, resistor_bands(47.0).to_vec());
        assert!(objects.last_reading.is_none());
    }

    #[test]
    fn band_colours_follow_colour_code() {
        assert_eq!(resistor_bands(10.0), [0x8b4513, 0x000000, 0x000000, 0xffd700]);
        assert_eq!(resistor_bands(47.0), [0xffff00, 0x8a2be2, 0x000000, 0xffd700]);
        assert_eq!(resistor_bands(100.0)[0], 0x000000);
        assert_eq!(resistor_bands(99.6), resistor_bands(100.0));
    }

    #[test]
    fn scene_has_every_component() {
        let params = Circuit.descriptor().default_params();
        let (scene, objects) = setup(&params);
        assert_eq!(objects.wires.len(), 12);
        // board, battery, 3 × (group + body + 4 bands), 12 wires, 4 arrows,
        // 2 lights, 4 labels
        assert_eq!(scene.node_count(), 2 + 18 + 12 + 4 + 2 + 4);
    }

    proptest! {
        #[test]
        fn branch_currents_follow_ohms_law(
            v in 1.0f64..24.0,
            r1 in 1.0f64..100.0,
            r2 in 1.0f64..100.0,
            r3 in 1.0f64..100.0,
        ) {
            let reading = analyze(v, [r1, r2, r3]);
            prop_assert_eq!(reading.branch_currents, [v / r1, v / r2, v / r3]);
            let inverse_sum = 1.0 / r1 + 1.0 / r2 + 1.0 / r3;
            prop_assert!((1.0 / reading.total_resistance - inverse_sum).abs() < 1e-12 * inverse_sum);
            prop_assert!(reading.total_resistance <= r1.min(r2).min(r3));
            let summed: f64 = reading.branch_currents.iter().sum();
            prop_assert!((reading.total_current - summed).abs() < 1e-9 * summed);
        }
    }
}
