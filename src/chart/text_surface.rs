//! Terminal backend: draws candles and the SMA overlay as a character grid,
//! with the latest value of every overlay printed under the chart.

use super::{ChartData, Surface};
use crate::models::{Candle, IndicatorPoint};
use colored::Colorize;
use std::collections::HashMap;

const PIXELS_PER_ROW: u32 = 20;
const MIN_ROWS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tone {
    Blank,
    Up,
    Down,
    Overlay,
}

/// Live rendering context of the text backend
#[derive(Debug, Clone)]
pub struct TextCanvas {
    id: u64,
    width: u32,
    rows: usize,
    data: ChartData,
}

impl TextCanvas {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn candle_count(&self) -> usize {
        self.data.candles.len()
    }

    /// Render the grid. `color` toggles ANSI colors.
    pub fn render(&self, color: bool) -> String {
        let columns = (self.width as usize).min(self.data.candles.len());
        if columns == 0 {
            return format!("{}\n", "(no candle data)".dimmed());
        }

        let visible = &self.data.candles[self.data.candles.len() - columns..];
        let sma: HashMap<i64, f64> = self
            .data
            .overlays
            .first()
            .map(|o| o.points.iter().map(|p| (p.time, p.value)).collect())
            .unwrap_or_default();

        let (lo, hi) = price_range(visible, &sma);
        let span = if hi > lo { hi - lo } else { 1.0 };
        let last_row = (self.rows - 1) as f64;
        let row_of = |price: f64| (((hi - price) / span) * last_row).round().clamp(0.0, last_row) as usize;

        let mut grid = vec![vec![(' ', Tone::Blank); columns]; self.rows];
        for (x, candle) in visible.iter().enumerate() {
            let tone = if candle.close >= candle.open { Tone::Up } else { Tone::Down };

            for row in grid.iter_mut().take(row_of(candle.low) + 1).skip(row_of(candle.high)) {
                row[x] = ('│', tone);
            }

            let (top, bottom) = (row_of(candle.open.max(candle.close)), row_of(candle.open.min(candle.close)));
            for row in grid.iter_mut().take(bottom + 1).skip(top) {
                row[x] = ('█', tone);
            }

            if let Some(&value) = sma.get(&candle.time) {
                let cell = &mut grid[row_of(value)][x];
                if cell.1 == Tone::Blank {
                    *cell = ('•', Tone::Overlay);
                }
            }
        }

        let mut out = String::new();
        for (r, row) in grid.iter().enumerate() {
            let label = if r == 0 {
                format!("{:>10.2} ┤", hi)
            } else if r == self.rows - 1 {
                format!("{:>10.2} ┤", lo)
            } else {
                format!("{:>10} │", "")
            };
            out.push_str(&label);
            for &(ch, tone) in row {
                out.push_str(&paint(ch, tone, color));
            }
            out.push('\n');
        }

        for overlay in &self.data.overlays {
            let latest = overlay
                .points
                .last()
                .map(|p: &IndicatorPoint| format!("{:.2}", p.value))
                .unwrap_or_else(|| "warming up".to_string());
            out.push_str(&format!("{:>10}   {}: {}\n", "", overlay.name, latest));
        }

        out
    }
}

fn price_range(candles: &[Candle], overlay: &HashMap<i64, f64>) -> (f64, f64) {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for c in candles {
        lo = lo.min(c.low);
        hi = hi.max(c.high);
        if let Some(&v) = overlay.get(&c.time) {
            lo = lo.min(v);
            hi = hi.max(v);
        }
    }
    (lo, hi)
}

fn paint(ch: char, tone: Tone, color: bool) -> String {
    let s = ch.to_string();
    if !color {
        return s;
    }
    match tone {
        Tone::Blank => s,
        Tone::Up => s.green().to_string(),
        Tone::Down => s.red().to_string(),
        Tone::Overlay => s.yellow().to_string(),
    }
}

/// Text rendering backend. Counts contexts so leaks are observable.
#[derive(Debug, Default)]
pub struct TextSurface {
    next_id: u64,
    created: usize,
    destroyed: usize,
}

impl TextSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live_contexts(&self) -> usize {
        self.created - self.destroyed
    }

    pub fn created(&self) -> usize {
        self.created
    }
}

impl Surface for TextSurface {
    type Context = TextCanvas;

    fn create(&mut self, width: u32, height: u32) -> TextCanvas {
        self.next_id += 1;
        self.created += 1;
        TextCanvas {
            id: self.next_id,
            width,
            rows: ((height / PIXELS_PER_ROW) as usize).max(MIN_ROWS),
            data: ChartData::default(),
        }
    }

    fn update_data(&mut self, ctx: &mut TextCanvas, data: &ChartData) {
        ctx.data = data.clone();
    }

    fn resize(&mut self, ctx: &mut TextCanvas, width: u32) {
        ctx.width = width;
    }

    fn destroy(&mut self, ctx: TextCanvas) {
        self.destroyed += 1;
        drop(ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::OverlaySeries;

    fn candle(time: i64, open: f64, close: f64) -> Candle {
        Candle {
            time,
            open,
            high: open.max(close) + 1.0,
            low: open.min(close) - 1.0,
            close,
        }
    }

    #[test]
    fn test_rows_follow_height() {
        let mut surface = TextSurface::new();
        let canvas = surface.create(40, 280);
        assert_eq!(canvas.rows(), 14);
        assert_eq!(surface.create(40, 10).rows(), MIN_ROWS);
    }

    #[test]
    fn test_render_shows_last_candles_only() {
        let mut surface = TextSurface::new();
        let mut canvas = surface.create(3, 100);
        let data = ChartData {
            candles: (0..10).map(|i| candle(i, 10.0 + i as f64, 11.0 + i as f64)).collect(),
            overlays: vec![OverlaySeries {
                name: "SMA 2".to_string(),
                points: vec![],
            }],
        };
        surface.update_data(&mut canvas, &data);

        let out = canvas.render(false);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), canvas.rows() + 1);
        // last three candles span 16..=21
        assert!(lines[0].contains("21.00"));
        assert!(lines[canvas.rows() - 1].contains("16.00"));
        assert!(out.contains("SMA 2: warming up"));
    }

    #[test]
    fn test_render_empty() {
        let mut surface = TextSurface::new();
        let canvas = surface.create(10, 100);
        assert!(canvas.render(false).contains("no candle data"));
        surface.destroy(canvas);
        assert_eq!(surface.live_contexts(), 0);
    }
}
