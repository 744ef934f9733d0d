use flow_dashboard::chart::{ChartData, ChartPhase, ChartSurface, Container, TextSurface};
use flow_dashboard::config;
use flow_dashboard::models::Candle;

#[cfg(test)]
mod tests {
    use super::*;

    fn candles(n: usize) -> Vec<Candle> {
        (0..n)
            .map(|i| {
                let close = 100.0 + (i % 7) as f64;
                Candle {
                    time: 1_700_000_000 + i as i64 * 60,
                    open: close - 0.5,
                    high: close + 1.0,
                    low: close - 1.0,
                    close,
                }
            })
            .collect()
    }

    fn chart() -> ChartSurface<TextSurface> {
        ChartSurface::new(TextSurface::new(), config::CHART_HEIGHT)
    }

    #[test]
    fn test_zero_width_mount_defers_until_resize() {
        let mut container = Container::new(0);
        let mut chart = chart();

        assert_eq!(chart.mount(&mut container), ChartPhase::Uninitialized);
        assert!(!chart.is_live());
        assert_eq!(chart.surface().live_contexts(), 0);

        // data arriving before creation is replayed on create
        chart.update(ChartData::with_indicators(&candles(60), 50, 14));
        assert!(!chart.is_live());

        for id in container.set_width(72) {
            chart.on_resize(&container, id);
        }

        assert_eq!(chart.phase(), ChartPhase::Ready);
        let canvas = chart.context().unwrap();
        assert_eq!(canvas.width(), 72);
        assert_eq!(canvas.candle_count(), 60);
    }

    #[test]
    fn test_resize_updates_width_only() {
        let mut container = Container::new(80);
        let mut chart = chart();
        chart.mount(&mut container);
        let rows = chart.context().unwrap().rows();

        for id in container.set_width(120) {
            chart.on_resize(&container, id);
        }

        let canvas = chart.context().unwrap();
        assert_eq!(canvas.width(), 120);
        assert_eq!(canvas.rows(), rows);
        assert_eq!(chart.surface().created(), 1);
    }

    #[test]
    fn test_empty_data_stays_ready() {
        let mut container = Container::new(80);
        let mut chart = chart();
        chart.mount(&mut container);
        chart.update(ChartData::with_indicators(&[], 50, 14));

        assert_eq!(chart.phase(), ChartPhase::Ready);
        assert_eq!(chart.context().unwrap().candle_count(), 0);
    }

    #[test]
    fn test_resize_after_destroy_is_ignored() {
        let mut container = Container::new(80);
        let mut chart = chart();
        chart.mount(&mut container);
        let listener = chart.listener().unwrap();

        chart.destroy(&mut container);
        assert!(!container.has_listener(listener));

        container.set_width(100);
        chart.on_resize(&container, listener);

        assert_eq!(chart.phase(), ChartPhase::Destroyed);
        assert!(!chart.is_live());
        assert_eq!(chart.surface().live_contexts(), 0);
    }

    #[test]
    fn test_ticker_changes_never_leak() {
        let mut container = Container::new(80);
        let mut chart = chart();

        for n in [10, 20, 30, 40] {
            chart.destroy(&mut container);
            chart.mount(&mut container);
            chart.update(ChartData::with_indicators(&candles(n), 50, 14));

            assert_eq!(chart.surface().live_contexts(), 1);
            assert_eq!(container.listener_count(), 1);
            assert_eq!(chart.context().unwrap().candle_count(), n);
        }

        assert_eq!(chart.surface().created(), 4);
        chart.destroy(&mut container);
        assert_eq!(container.listener_count(), 0);
        assert_eq!(chart.surface().live_contexts(), 0);
    }

    #[test]
    fn test_foreign_listener_is_ignored() {
        let mut container = Container::new(80);
        let mut chart = chart();
        chart.mount(&mut container);

        let stranger = container.add_resize_listener();
        container.set_width(10);
        chart.on_resize(&container, stranger);

        assert_eq!(chart.context().unwrap().width(), 80);
    }

    #[test]
    fn test_dropped_chart_releases_listener() {
        let mut container = Container::new(80);
        {
            let mut chart = chart();
            chart.mount(&mut container);
            assert_eq!(container.listener_count(), 1);
        }
        assert_eq!(container.listener_count(), 0);

        let mut next = chart();
        next.mount(&mut container);
        assert_eq!(container.listener_count(), 1);
        assert_eq!(container.set_width(100), vec![next.listener().unwrap()]);
    }
}
