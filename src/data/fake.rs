/*!
Generate fake daily tick data, for testing and offline runs
*/
use super::Tick;
use crate::util::is_business_day;
use chrono::{Duration, NaiveDate};
use rand::Rng;
use rand_distr::{Distribution, Normal};

/// A trait implemented by price generators
pub trait PriceGen {
    /// Generate the next daily close
    fn next_price(&mut self) -> f64;
}

/// Generate fake prices using a multiplicative Gaussian random walk
#[derive(Debug, Copy, Clone)]
pub struct PriceRandomWalk<R> {
    /// The RNG used by this random walk
    pub rng: R,
    /// The current price
    pub price: f64,
    /// The distribution of daily returns
    pub returns: Normal<f64>,
    /// Prices never fall below this floor
    pub floor: f64,
}

impl<R: Rng> PriceRandomWalk<R> {
    /// A walk starting at `price` with daily returns of standard deviation `sigma`
    pub fn new(rng: R, price: f64, sigma: f64) -> Result<PriceRandomWalk<R>, rand_distr::NormalError> {
        Ok(PriceRandomWalk {
            rng,
            price,
            returns: Normal::new(0.0, sigma)?,
            floor: 0.01,
        })
    }
}

impl<R: Rng> PriceGen for PriceRandomWalk<R> {
    fn next_price(&mut self) -> f64 {
        let ret = self.returns.sample(&mut self.rng);
        self.price = (self.price * (1.0 + ret)).max(self.floor);
        self.price
    }
}

/// Generate business-day tick data from a price generator
#[derive(Debug, Clone)]
pub struct TickGen<P: PriceGen> {
    /// The next date to emit, rolled forward to a business day
    pub date: NaiveDate,
    /// The price generator in use
    pub price_gen: P,
}

impl<P: PriceGen> Iterator for TickGen<P> {
    type Item = Tick;

    fn next(&mut self) -> Option<Tick> {
        while !is_business_day(self.date) {
            self.date = self.date + Duration::days(1);
        }
        let t = self.date;
        self.date = self.date + Duration::days(1);
        let c = self.price_gen.next_price();
        Some(Tick::close_only(t, c))
    }
}

/// A deterministic business-day series of `len` ticks following `f(i)`
pub fn ticks_from_fn<F: Fn(usize) -> f64>(start: NaiveDate, len: usize, f: F) -> Vec<Tick> {
    let gen = TickGen {
        date: start,
        price_gen: Counter { i: 0, f },
    };
    gen.take(len).collect()
}

struct Counter<F> {
    i: usize,
    f: F,
}

impl<F: Fn(usize) -> f64> PriceGen for Counter<F> {
    fn next_price(&mut self) -> f64 {
        let price = (self.f)(self.i);
        self.i += 1;
        price
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn random_walk_stays_positive_on_business_days() {
        let start = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let gen = TickGen {
            date: start,
            price_gen: PriceRandomWalk::new(StdRng::seed_from_u64(7), 40.0, 0.5).unwrap(),
        };
        let ticks: Vec<Tick> = gen.take(200).collect();
        assert_eq!(ticks.len(), 200);
        assert!(ticks.iter().all(|t| t.c > 0.0 && is_business_day(t.t)));
        assert!(ticks.windows(2).all(|w| w[0].t < w[1].t));
    }

    #[test]
    fn deterministic_series() {
        let start = NaiveDate::from_ymd_opt(2024, 6, 14).unwrap();
        let ticks = ticks_from_fn(start, 3, |i| i as f64 * 2.0);
        assert_eq!(super::super::closes(&ticks), vec![0.0, 2.0, 4.0]);
        assert_eq!(ticks[1].t, NaiveDate::from_ymd_opt(2024, 6, 17).unwrap());
    }
}
