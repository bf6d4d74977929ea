use smear_core::{
    bone_contribution, endpoint_velocities, sample_animation, BakeOptions, BoneFrame, Config,
    Diagnostics, FrameRange, InMemoryScene, SmearBaker,
};

fn approx(a: f64, b: f64, eps: f64) -> bool {
    (a - b).abs() <= eps
}

fn scene() -> InMemoryScene {
    let json = smear_test_fixtures::scenes::json("shoulder_elbow").expect("fixture");
    InMemoryScene::from_json_str(&json).expect("scene parses")
}

// Vertex layout of the fixture, relative to the shoulder head.
const PLUS_HALF: usize = 0;
const MINUS_HALF: usize = 1;
const PLUS_QUARTER: usize = 2;
const ON_HEAD: usize = 3;

#[test]
fn first_frame_motion_is_broadside() {
    let mut scene = scene();
    let joints = vec!["shoulder".to_string(), "elbow".to_string()];
    let samples = sample_animation(
        &mut scene,
        "arm",
        FrameRange::new(1, 3).unwrap(),
        &joints,
        &mut Diagnostics::new(),
        &mut |_| {},
    )
    .unwrap();

    let cfg = Config::default();
    let motion = endpoint_velocities(&samples, 0, "shoulder", cfg.velocity_epsilon).unwrap();
    let bone = BoneFrame::prepare(samples.bone(0, "shoulder").unwrap(), motion, &cfg).unwrap();
    let position = samples.positions[0][PLUS_HALF];
    let c = bone_contribution(position, &bone, &cfg).unwrap();

    assert!(approx(c.colinearity, 1.0, 1e-12));
    assert!(approx(c.delta, 0.5, 1e-12));
    assert_eq!(c.u, 0.0);

    // The elbow has no child: zero-length bone, never prepared.
    let elbow = samples.bone(0, "elbow").unwrap();
    assert!(elbow.is_degenerate(cfg.bone_epsilon));
}

#[test]
fn raw_offsets_follow_the_vertex_side() {
    let mut scene = scene();
    let out = SmearBaker::default()
        .bake(&mut scene, &BakeOptions::default(), &mut |_| {})
        .unwrap();
    let raw = &out.raw;
    assert_eq!(raw.frame_count(), 3);

    let plus = raw.vertex_series(PLUS_HALF);
    assert!(approx(plus[0], 0.5, 1e-12));
    assert!(approx(plus[1], 0.5 * 0.5 / 2f64.sqrt(), 1e-12));
    assert!(approx(plus[2], 0.2 * 0.5 / 5f64.sqrt(), 1e-12));

    for f in 0..3 {
        assert!(raw.values[f][PLUS_HALF] > 0.0);
        assert!(raw.values[f][PLUS_QUARTER] > 0.0);
        assert!(raw.values[f][MINUS_HALF] < 0.0);
        assert!(approx(
            raw.values[f][PLUS_QUARTER] * 2.0,
            raw.values[f][PLUS_HALF],
            1e-12
        ));
        assert_eq!(raw.values[f][ON_HEAD], 0.0);
    }
}

#[test]
fn smoothed_middle_frame_lies_between_the_ends() {
    let mut scene = scene();
    let out = SmearBaker::default()
        .bake(&mut scene, &BakeOptions::default(), &mut |_| {})
        .unwrap();
    let smoothed = out.smoothed.vertex_series(PLUS_HALF);

    let (lo, hi) = (smoothed[2].min(smoothed[0]), smoothed[2].max(smoothed[0]));
    assert!(smoothed[1] > lo && smoothed[1] < hi, "{smoothed:?}");

    // Edge-truncated, renormalized 5-tap kernel over three frames.
    let raw = out.raw.vertex_series(PLUS_HALF);
    let (w0, w1, w2) = (1.0, 64.0 / 81.0, 25.0 / 81.0);
    let first = (w0 * raw[0] + w1 * raw[1] + w2 * raw[2]) / (w0 + w1 + w2);
    let middle = (w1 * raw[0] + w0 * raw[1] + w1 * raw[2]) / (w0 + 2.0 * w1);
    assert!(approx(smoothed[0], first, 1e-12));
    assert!(approx(smoothed[1], middle, 1e-12));

    for v in out.smoothed.vertex_series(MINUS_HALF) {
        assert!(v < 0.0);
    }
    assert!(out
        .smoothed
        .vertex_series(ON_HEAD)
        .iter()
        .all(|&v| v == 0.0));
}

#[test]
fn cache_matches_the_sampled_trajectories() {
    let mut scene = scene();
    let out = SmearBaker::default()
        .bake(&mut scene, &BakeOptions::default(), &mut |_| {})
        .unwrap();
    let cache = &out.cache;
    assert_eq!(cache.vertex_count, 4);
    assert_eq!((cache.start_frame, cache.end_frame), (1, 3));
    assert_eq!(cache.positions_at(2).unwrap()[PLUS_HALF], [1.5, 0.0, 0.0]);
    assert_eq!(cache.offsets_at(3).unwrap(), out.smoothed.at(3).unwrap());
    assert!(out.diagnostics.is_clean(), "{:?}", out.diagnostics);
}
