use ulog_explorer_protocol::{LineStyle, PlotCommand, Point, Symbol, ThemeToken};

use crate::model::{Session, Slot};

use super::markers::marker_label;

/// Min-max scale to [0, 1]; a constant series maps to 0.
pub fn rescale(values: &[f64]) -> Vec<f64> {
    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let span = max - min;
    values
        .iter()
        .map(|&v| if span > 0.0 { (v - min) / span } else { 0.0 })
        .collect()
}

/// Curves for the selection in every loaded slot, followed by the overlays
/// each slot has switched on.
pub fn render_curves(session: &Session) -> Vec<PlotCommand> {
    let style = session.style();
    let mut commands = Vec::new();

    for entry in session.selection().entries() {
        for (slot, loaded) in session.loaded() {
            let Some((index, values)) = loaded.recording.column(&entry.topic, &entry.field) else {
                continue;
            };
            let values = if style.rescale { rescale(values) } else { values.to_vec() };
            let (label, line) = match slot {
                Slot::Primary => (entry.combined_name(), LineStyle::Solid),
                Slot::Secondary => (format!("{} (2)", entry.combined_name()), LineStyle::Dashed),
            };
            commands.push(PlotCommand::Curve {
                label,
                color: entry.color,
                width: style.line_width(),
                style: line,
                symbol: style.symbols.then_some(Symbol::Circle),
                points: index
                    .iter()
                    .zip(&values)
                    .map(|(&x, &y)| Point::new(x, y))
                    .collect(),
            });
        }
    }

    let mut legend = false;
    let mut titles = Vec::new();
    for (_, loaded) in session.loaded() {
        let display = &loaded.display;
        let recording = &loaded.recording;

        if display.show_transitions {
            let lines = recording
                .transitions
                .forward
                .iter()
                .map(|&x| (x, ThemeToken::ForwardTransition))
                .chain(
                    recording
                        .transitions
                        .backward
                        .iter()
                        .map(|&x| (x, ThemeToken::BackTransition)),
                );
            commands.extend(lines.map(|(x, color)| PlotCommand::VerticalLine { x, color, label: None }));
        }

        if display.show_parameter_changes {
            let changes = recording.parameter_change_times().zip(&recording.changed_parameters);
            commands.extend(changes.map(|(x, change)| PlotCommand::VerticalLine {
                x,
                color: ThemeToken::ParameterChange,
                label: Some(format!("{}: {}", change.name, change.value)),
            }));
        }

        if display.marker.visible {
            let x = display.marker.position;
            commands.push(PlotCommand::MarkerLine {
                x,
                label: marker_label(recording, session.selection(), x),
            });
        }

        if display.roi.visible {
            commands.push(PlotCommand::Region {
                range: display.roi.range,
                color: ThemeToken::RoiFill,
            });
        }

        legend |= display.show_legend;
        if display.show_title {
            titles.push(recording.title.as_str());
        }
    }

    if legend {
        commands.push(PlotCommand::Legend);
    }
    if !titles.is_empty() {
        commands.push(PlotCommand::Title {
            text: titles.join(" | "),
        });
    }
    commands
}

/// [`render_curves`] plus a trailing `AutoRange` when the session asks for
/// the viewport to be refit.
pub fn render_frame(session: &mut Session) -> Vec<PlotCommand> {
    let mut commands = render_curves(session);
    if session.take_auto_range() {
        commands.push(PlotCommand::AutoRange);
    }
    commands
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ParamValue, ParameterChange, Recording, TopicTable, TransitionEvents};

    fn recording(source: &str, values: Vec<f64>) -> Recording {
        let mut t = TopicTable::with_index(vec![1.0, 2.0, 3.0]);
        t.insert_derived("v", values).unwrap();
        let mut rec = Recording {
            source: source.into(),
            title: source.into(),
            start_timestamp: 0,
            last_timestamp: 4_000_000,
            transitions: TransitionEvents {
                forward: vec![1.5],
                backward: vec![2.5],
            },
            changed_parameters: vec![ParameterChange {
                timestamp: 2_000_000,
                name: "MPC_XY_VEL_MAX".into(),
                value: ParamValue::Float(12.0),
            }],
            ..Recording::default()
        };
        rec.tables.insert("t_0".into(), t);
        rec
    }

    fn curves(commands: &[PlotCommand]) -> Vec<(&str, LineStyle, &[Point])> {
        commands
            .iter()
            .filter_map(|c| match c {
                PlotCommand::Curve { label, style, points, .. } => Some((label.as_str(), *style, points.as_slice())),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn rescale_handles_constant_series() {
        assert_eq!(rescale(&[2.0, 4.0, 3.0]), vec![0.0, 1.0, 0.5]);
        assert_eq!(rescale(&[7.0, 7.0]), vec![0.0, 0.0]);
    }

    #[test]
    fn secondary_recording_is_dashed() {
        let mut s = Session::new();
        s.install(Slot::Primary, recording("a", vec![1.0, 2.0, 3.0]));
        s.install(Slot::Secondary, recording("b", vec![3.0, 2.0, 1.0]));
        s.add_selected("t_0", "v").unwrap();
        s.add_selected("t_0", "absent").unwrap();
        let cmds = render_curves(&s);
        let c = curves(&cmds);
        assert_eq!(c.len(), 2);
        assert_eq!((c[0].0, c[0].1), ("t_0->v", LineStyle::Solid));
        assert_eq!((c[1].0, c[1].1), ("t_0->v (2)", LineStyle::Dashed));
        assert_eq!(c[1].2[0], Point::new(1.0, 3.0));
    }

    #[test]
    fn overlays_follow_display_toggles() {
        let mut s = Session::new();
        s.install(Slot::Primary, recording("a", vec![1.0, 2.0, 3.0]));
        assert!(render_curves(&s).is_empty());

        s.toggle_transitions(Slot::Primary);
        s.toggle_parameter_changes(Slot::Primary);
        s.toggle_marker(Slot::Primary);
        s.toggle_roi(Slot::Primary);
        s.toggle_legend(Slot::Primary);
        s.toggle_title(Slot::Primary);
        let cmds = render_curves(&s);
        assert!(cmds.contains(&PlotCommand::VerticalLine {
            x: 1.5,
            color: ThemeToken::ForwardTransition,
            label: None
        }));
        assert!(cmds.contains(&PlotCommand::VerticalLine {
            x: 2.5,
            color: ThemeToken::BackTransition,
            label: None
        }));
        assert!(cmds.iter().any(|c| matches!(
            c,
            PlotCommand::VerticalLine { x, color: ThemeToken::ParameterChange, label: Some(l) }
                if *x == 2.0 && l == "MPC_XY_VEL_MAX: 12"
        )));
        assert!(cmds.iter().any(|c| matches!(c, PlotCommand::MarkerLine { x, .. } if *x == 2.0)));
        assert!(cmds.iter().any(|c| matches!(c, PlotCommand::Region { .. })));
        assert!(cmds.contains(&PlotCommand::Legend));
        assert!(cmds.contains(&PlotCommand::Title { text: "a".into() }));
    }

    #[test]
    fn frame_requests_auto_range_once() {
        let mut s = Session::new();
        s.install(Slot::Primary, recording("a", vec![1.0, 2.0, 3.0]));
        s.add_selected("t_0", "v").unwrap();
        assert_eq!(render_frame(&mut s).last(), Some(&PlotCommand::AutoRange));
        assert_ne!(render_frame(&mut s).last(), Some(&PlotCommand::AutoRange));
    }

    #[test]
    fn style_flows_into_curves() {
        let mut s = Session::new();
        s.install(Slot::Primary, recording("a", vec![1.0, 2.0, 5.0]));
        s.add_selected("t_0", "v").unwrap();
        s.toggle_bold();
        s.toggle_symbols();
        s.toggle_rescale();
        let cmds = render_curves(&s);
        let Some(PlotCommand::Curve { width, symbol, points, .. }) = cmds.first() else {
            panic!("expected a curve");
        };
        assert_eq!(*width, 3);
        assert_eq!(*symbol, Some(Symbol::Circle));
        assert_eq!(points[2].y, 1.0);
        assert_eq!(points[1].y, 0.25);
    }
}
