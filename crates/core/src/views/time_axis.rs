use waterfall_protocol::{Point, Rect, RenderCommand, SharedStr, TextAlign, ThemeToken, Viewport};

const AXIS_HEIGHT: f64 = 24.0;
const MAJOR_TICK_HEIGHT: f64 = 10.0;
const MINOR_TICK_HEIGHT: f64 = 4.0;
const FONT_SIZE: f64 = 10.0;
const MIN_MAJOR_SPACING_PX: f64 = 80.0;

/// Render the ruler above the timeline column.
///
/// `view_start` and `view_end` are seconds relative to the trace start, so
/// labels read as offsets into the trace. The ruler occupies
/// `viewport.x .. viewport.x + viewport.width`.
pub fn render_time_axis(viewport: &Viewport, view_start: f64, view_end: f64) -> Vec<RenderCommand> {
    let duration = view_end - view_start;
    if duration <= 0.0 || viewport.width <= 0.0 {
        return Vec::new();
    }

    let x_scale = viewport.width / duration;
    let to_x = |t: f64| viewport.x + (t - view_start) * x_scale;
    let in_range = |x: f64| x >= viewport.x && x <= viewport.x + viewport.width;
    let mut commands = Vec::with_capacity(64);

    commands.push(RenderCommand::BeginGroup {
        id: "time-axis".into(),
        label: None,
    });
    commands.push(RenderCommand::DrawRect {
        rect: Rect::new(viewport.x, 0.0, viewport.width, AXIS_HEIGHT),
        color: ThemeToken::AxisBackground,
        border_color: Some(ThemeToken::Border),
        label: None,
        span_id: None,
    });

    let (major, subdivisions) = nice_interval(duration, viewport.width);
    let minor = major / f64::from(subdivisions);

    // Minor ticks, skipping the positions a major tick will cover.
    let mut i = (view_start / minor).floor() as i64;
    loop {
        let t = i as f64 * minor;
        if t > view_end {
            break;
        }
        let x = to_x(t);
        if in_range(x) && i.rem_euclid(i64::from(subdivisions)) != 0 {
            commands.push(RenderCommand::DrawLine {
                from: Point::new(x, AXIS_HEIGHT - MINOR_TICK_HEIGHT),
                to: Point::new(x, AXIS_HEIGHT),
                color: ThemeToken::AxisTick,
                width: 0.5,
                dashed: false,
            });
        }
        i += 1;
    }

    let mut i = (view_start / major).floor() as i64;
    loop {
        let t = i as f64 * major;
        if t > view_end {
            break;
        }
        let x = to_x(t);
        if in_range(x) {
            commands.push(RenderCommand::DrawLine {
                from: Point::new(x, AXIS_HEIGHT - MAJOR_TICK_HEIGHT),
                to: Point::new(x, AXIS_HEIGHT),
                color: ThemeToken::AxisGridline,
                width: 1.0,
                dashed: false,
            });
            commands.push(RenderCommand::DrawText {
                position: Point::new(x + 3.0, AXIS_HEIGHT / 2.0 - 2.0),
                text: SharedStr::from(format_duration(t)),
                color: ThemeToken::TextSecondary,
                font_size: FONT_SIZE,
                align: TextAlign::Left,
            });
        }
        i += 1;
    }

    commands.push(RenderCommand::EndGroup);
    commands
}

/// Pick a "nice" major tick interval in seconds for the visible duration.
/// Returns `(major_interval, minor_subdivisions)`.
fn nice_interval(duration: f64, width_px: f64) -> (f64, u32) {
    let target_count = (width_px / MIN_MAJOR_SPACING_PX).max(2.0);
    let raw = duration / target_count;

    let magnitude = 10.0_f64.powf(raw.log10().floor());
    let normalized = raw / magnitude;
    let (step, subdivisions) = if normalized <= 1.0 {
        (1.0, 5)
    } else if normalized <= 2.0 {
        (2.0, 4)
    } else if normalized <= 5.0 {
        (5.0, 5)
    } else {
        (10.0, 5)
    };
    (step * magnitude, subdivisions)
}

/// Format a duration in seconds for labels.
pub fn format_duration(secs: f64) -> String {
    let abs = secs.abs();
    if abs == 0.0 {
        "0ms".to_string()
    } else if abs >= 60.0 {
        let mins = (secs / 60.0).trunc();
        format!("{mins:.0}m{:.1}s", secs - mins * 60.0)
    } else if abs >= 1.0 {
        format!("{secs:.2}s")
    } else if abs >= 1e-3 {
        format!("{:.2}ms", secs * 1e3)
    } else if abs >= 1e-6 {
        format!("{:.1}\u{b5}s", secs * 1e6)
    } else {
        format!("{:.0}ns", secs * 1e9)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nice_interval_selects_reasonable_value() {
        // 1 second over 800px: ~10 majors.
        let (interval, _) = nice_interval(1.0, 800.0);
        assert!((0.05..=0.2).contains(&interval), "interval={interval}");

        let (interval, _) = nice_interval(0.003, 800.0);
        assert!((interval - 0.0005).abs() < 1e-12, "interval={interval}");
    }

    #[test]
    fn renders_ticks_and_labels() {
        let mut vp = Viewport::new(800.0, 24.0);
        vp.x = 200.0;
        let cmds = render_time_axis(&vp, 0.0, 1.0);

        let labels: Vec<_> = cmds
            .iter()
            .filter_map(|c| match c {
                RenderCommand::DrawText { text, position, .. } => {
                    Some((text.to_string(), position.x))
                }
                _ => None,
            })
            .collect();
        assert_eq!(labels.first().map(|(t, _)| t.as_str()), Some("0ms"));
        assert!(labels.iter().all(|(_, x)| *x >= 200.0));
        assert!(labels.len() >= 5);

        let lines = cmds
            .iter()
            .filter(|c| matches!(c, RenderCommand::DrawLine { .. }))
            .count();
        assert!(lines > labels.len());
    }

    #[test]
    fn empty_window_renders_nothing() {
        assert!(render_time_axis(&Viewport::new(800.0, 24.0), 0.5, 0.5).is_empty());
    }

    #[test]
    fn format_labels() {
        assert_eq!(format_duration(0.0), "0ms");
        assert_eq!(format_duration(0.0005), "500.0\u{b5}s");
        assert_eq!(format_duration(0.25), "250.00ms");
        assert_eq!(format_duration(1.5), "1.50s");
        assert_eq!(format_duration(90.0), "1m30.0s");
    }
}
