use hivsim::prelude::*;
use proptest::prelude::*;

fn parameters() -> impl Strategy<Value = ParameterSet> {
    (
        0.0..50.0f64,
        0.0..0.1f64,
        0.0..0.1f64,
        0.0..1e-4f64,
        0.0..0.01f64,
        0.01..1.0f64,
        0.1..5.0f64,
        0.0..2000.0f64,
        1.0..500.0f64,
        500.0..3000.0f64,
    )
        .prop_map(
            |(s, r, mu_t, k1, k2, mu_b, mu_v, burst_size, b, t_max)| ParameterSet {
                s,
                r,
                mu_t,
                k1,
                k2,
                mu_b,
                mu_v,
                burst_size,
                b,
                t_max,
            },
        )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn burst_vanishes_at_start(params in parameters(), t in 0.0..3650.0f64) {
        let model = HivModel::new(params).unwrap();
        prop_assert_eq!(model.burst(0.0), 0.0);
        prop_assert!(model.burst(t) >= 0.0);
    }

    #[test]
    fn uninfected_state_stays_uninfected(params in parameters(), healthy in 0.0..1500.0f64) {
        let model = HivModel::new(params).unwrap();
        let dx = model.derivative(0.0, &StateVector::new(healthy, 0.0, 0.0, 0.0));
        prop_assert_eq!(dx.latent, 0.0);
        prop_assert_eq!(dx.active, 0.0);
        prop_assert_eq!(dx.virus, 0.0);
    }

    #[test]
    fn grid_honours_span(t0 in 0.0..100.0f64, length in 1e-3..1e4f64, n in 2usize..2000) {
        let span = TimeSpan::new(t0, t0 + length, n);
        let grid = TimeGrid::new(&span).unwrap();
        prop_assert_eq!(grid.len(), n);
        prop_assert_eq!(grid.first(), span.t0);
        prop_assert_eq!(grid.last(), span.tf);
        prop_assert!(grid.as_slice().windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn healthy_course_respects_capacity(healthy in 1.0..1400.0f64) {
        let params = ParameterSet::default();
        let initial = StateVector::new(healthy, 0.0, 0.0, 0.0);
        let trajectory = simulate(&params, &initial, &TimeSpan::new(0.0, 200.0, 50)).unwrap();
        prop_assert_eq!(trajectory.len(), 50);
        for state in trajectory.states() {
            prop_assert!(state.total_t_cells() <= params.t_max);
            prop_assert!(state.healthy > 0.0);
        }
    }
}
