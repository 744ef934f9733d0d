use flow_dashboard::indicators::{latest_rsi, rsi, sma};
use flow_dashboard::models::Candle;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[cfg(test)]
mod tests {
    use super::*;

    fn series(closes: &[f64]) -> Vec<Candle> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Candle {
                time: 1_700_000_000 + i as i64 * 60,
                open: close,
                high: close + 0.5,
                low: close - 0.5,
                close,
            })
            .collect()
    }

    fn random_walk(seed: u64, n: usize) -> Vec<Candle> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut price = 100.0;
        let closes: Vec<f64> = (0..n)
            .map(|_| {
                price += rng.gen_range(-3.0..3.0);
                price
            })
            .collect();
        series(&closes)
    }

    #[test]
    fn test_sma_sixty_candles() {
        let candles = random_walk(1, 60);
        let out = sma(&candles, 50);

        assert_eq!(out.len(), 10);
        assert_eq!(out[0].time, candles[50].time);
        let expected = candles[..50].iter().map(|c| c.close).sum::<f64>() / 50.0;
        assert!((out[0].value - expected).abs() < 1e-9);
    }

    #[test]
    fn test_rsi_length_and_bounds() {
        for seed in 0..20 {
            let candles = random_walk(seed, 120);
            let out = rsi(&candles, 14);
            assert_eq!(out.len(), candles.len() - 14);
            assert!(out.iter().all(|p| (0.0..=100.0).contains(&p.value)));
        }
    }

    #[test]
    fn test_rsi_follows_trend() {
        let rising: Vec<f64> = (0..40).map(|i| 100.0 + i as f64 * 10.0).collect();
        let falling: Vec<f64> = (0..40).map(|i| 500.0 - i as f64 * 10.0).collect();

        let up = latest_rsi(&series(&rising), 14);
        let down = latest_rsi(&series(&falling), 14);

        assert!(up > 90.0);
        assert_eq!(down, 0.0);
    }

    #[test]
    fn test_extension_keeps_earlier_points() {
        let full = random_walk(99, 100);
        let prefix = &full[..70];

        assert_eq!(sma(prefix, 50), sma(&full, 50)[..20].to_vec());
        assert_eq!(rsi(prefix, 14), rsi(&full, 14)[..56].to_vec());
    }

    #[test]
    fn test_rerun_is_identical() {
        let candles = random_walk(5, 80);
        assert_eq!(sma(&candles, 50), sma(&candles, 50));
        assert_eq!(rsi(&candles, 14), rsi(&candles, 14));
    }
}
