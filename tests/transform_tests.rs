use std::cell::Cell;
use std::f64::consts::PI;
use std::rc::Rc;
use std::time::Duration;

use tilecam::constants::{LATITUDE_MAX, LONGITUDE_MAX, MAX_ZOOM};
use tilecam::prelude::*;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn transform(width: u32, height: u32) -> Transform {
    init_logging();
    let mut transform = Transform::default();
    transform.resize(Size::new(width, height)).unwrap();
    transform
}

fn assert_near(expected: f64, actual: f64, tolerance: f64) {
    assert!(
        (expected - actual).abs() <= tolerance,
        "expected {expected}, got {actual} (tolerance {tolerance})"
    );
}

fn wrapped(transform: &Transform) -> LatLng {
    transform.lat_lng(WrapMode::Wrapped)
}

/// Steps a running transition at the given offsets from its start, then to its end
fn run_transition(transform: &mut Transform, offsets_ms: &[u64]) {
    let start = transform.transition_start().unwrap_or_else(Instant::now);
    for offset in offsets_ms {
        transform.update_transitions(start + Duration::from_millis(*offset));
    }
    let start = transform.transition_start().unwrap_or_else(Instant::now);
    let end = start + transform.transition_duration();
    transform.update_transitions(end);
}

#[test]
fn test_invalid_zoom_is_ignored() {
    let mut transform = transform(1, 1);
    assert_eq!(wrapped(&transform), LatLng::new(0.0, 0.0));
    assert_eq!(transform.zoom(), 0.0);

    transform.jump_to(&CameraOptions::new().with_zoom(1.0));
    assert_near(1.0, transform.zoom(), 1e-12);

    transform.jump_to(&CameraOptions::new().with_zoom(f64::NAN));
    assert_near(1.0, transform.zoom(), 1e-12);

    transform.jump_to(&CameraOptions::new().with_center(LatLng::new(0.0, 0.0)).with_zoom(f64::NAN));
    assert_near(0.0, wrapped(&transform).lat, 1e-12);
    assert_near(0.0, wrapped(&transform).lng, 1e-12);
    assert_near(1.0, transform.zoom(), 1e-12);

    let max_zoom = transform.state().max_zoom();
    transform.jump_to(&CameraOptions::new().with_zoom(max_zoom + 0.1));
    assert_near(max_zoom, transform.zoom(), 1e-9);
}

#[test]
fn test_fly_to_at_max_zoom_stays_valid() {
    let mut transform = transform(1, 1);
    let max_zoom = transform.state().max_zoom();
    transform.jump_to(&CameraOptions::new().with_zoom(max_zoom));

    let target = CameraOptions::new()
        .with_center(LatLng::new(LATITUDE_MAX, LONGITUDE_MAX))
        .with_zoom(max_zoom);
    transform.fly_to(&target, &AnimationOptions::default());
    run_transition(&mut transform, &[]);
    assert_near(max_zoom, transform.zoom(), 1e-9);

    transform.resize(Size::new(100, 100)).unwrap();
    transform.fly_to(&target, &AnimationOptions::default());
    run_transition(&mut transform, &[]);
    assert!(transform.state().valid());
    assert_near(max_zoom, transform.zoom(), 1e-9);
}

#[test]
fn test_invalid_bearing_is_ignored() {
    let mut transform = transform(1, 1);

    transform.jump_to(&CameraOptions::new().with_zoom(1.0).with_bearing(2.0));
    assert_near(1.0, transform.zoom(), 1e-12);
    assert_near(-2f64.to_radians(), transform.bearing(), 1e-12);

    transform.jump_to(&CameraOptions::new().with_bearing(f64::NAN));
    assert_near(-2f64.to_radians(), transform.bearing(), 1e-12);
    assert_near(0.0, wrapped(&transform).lat, 1e-12);
}

#[test]
fn test_integer_zoom() {
    let mut transform = transform(1, 1);

    let mut check = |integer: u8, zoom: f64| {
        transform.jump_to(&CameraOptions::new().with_zoom(zoom));
        assert_near(zoom, transform.zoom(), 1e-8);
        assert_eq!(transform.state().integer_zoom(), integer);
        assert_near(zoom - f64::from(integer), transform.state().zoom_fraction(), 1e-8);
    };

    for integer in 0..20u8 {
        for percent in 0..100 {
            check(integer, f64::from(integer) + 0.01 * f64::from(percent));
        }
    }
    check(20, 20.0);
}

#[test]
fn test_perspective_projection() {
    let mut transform = transform(1000, 1000);
    transform.jump_to(
        &CameraOptions::new()
            .with_center(LatLng::new(38.0, -77.0))
            .with_zoom(10.0)
            .with_pitch(51.56620156),
    );

    let center = wrapped(&transform);
    assert_near(38.0, center.lat, 1e-9);
    assert_near(-77.0, center.lng, 1e-9);

    let state = transform.state();
    let top_left = state.screen_coordinate_to_lat_lng(&Point::new(0.0, 1000.0), WrapMode::Wrapped);
    assert_near(-77.59198961199148, top_left.lng, 1e-6);
    assert_near(38.74661326302018, top_left.lat, 1e-6);

    let bottom_right =
        state.screen_coordinate_to_lat_lng(&Point::new(1000.0, 0.0), WrapMode::Wrapped);
    assert_near(-76.75823239205641, bottom_right.lng, 1e-6);
    assert_near(37.692872969426375, bottom_right.lat, 1e-6);

    let point =
        state.lat_lng_to_screen_coordinate(&LatLng::new(38.74661326302018, -77.59198961199148));
    assert_near(0.0, point.x, 1e-5);
    assert_near(1000.0, point.y, 1e-4);

    let (point, clip) =
        state.lat_lng_to_screen_coordinate_with_w(&LatLng::new(
            37.692872969426375,
            -76.75823239205641,
        ));
    assert_near(1000.0, point.x, 1e-5);
    assert_near(0.0, point.y, 1e-4);
    assert!(clip.w > 0.0);

    transform.jump_to(
        &CameraOptions::new()
            .with_center(LatLng::new(38.0, -77.0))
            .with_zoom(18.0)
            .with_pitch(51.56620156),
    );
    let (_, clip) = transform
        .state()
        .lat_lng_to_screen_coordinate_with_w(&LatLng::new(7.692872969426375, -76.75823239205641));
    assert!(clip.w < 0.0);
}

#[test]
fn test_unwrapped_lat_lng_roundtrip() {
    let mut transform = transform(1000, 1000);
    transform.jump_to(
        &CameraOptions::new()
            .with_center(LatLng::new(38.0, -77.0))
            .with_zoom(10.0)
            .with_pitch(51.56620156),
    );
    let state = transform.state();

    let center = state.screen_coordinate_to_lat_lng(&Point::new(500.0, 500.0), WrapMode::Unwrapped);
    assert_near(38.0, center.lat, 1e-8);
    assert_near(-77.0, center.lng, 1e-8);

    let rightwards = state.screen_coordinate_to_lat_lng(
        &state.lat_lng_to_screen_coordinate(&LatLng::new(38.0, 283.0)),
        WrapMode::Unwrapped,
    );
    assert_near(38.0, rightwards.lat, 1e-8);
    assert_near(283.0, rightwards.lng, 1e-8);
    assert_near(-77.0, rightwards.wrapped().lng, 1e-8);

    let leftwards = state.screen_coordinate_to_lat_lng(
        &state.lat_lng_to_screen_coordinate(&LatLng::new(38.0, -437.0)),
        WrapMode::Unwrapped,
    );
    assert_near(rightwards.lat, leftwards.lat, 1e-12);
    assert_near(-437.0, leftwards.lng, 1e-8);
    assert_near(-77.0, leftwards.wrapped().lng, 1e-8);
}

#[test]
fn test_constrain_height_only() {
    let mut transform = Transform::default();
    transform.set_constrain_mode(ConstrainMode::HeightOnly);
    transform.resize(Size::new(2, 2)).unwrap();

    let world = LatLngBounds::world();
    transform.jump_to(&CameraOptions::new().with_center(world.south_west).with_zoom(MAX_ZOOM));
    assert_near(-LATITUDE_MAX, wrapped(&transform).lat, 1e-7);
    assert_near(-LONGITUDE_MAX, wrapped(&transform).lng, 1e-7);

    transform.jump_to(&CameraOptions::new().with_center(world.north_east));
    assert_near(LATITUDE_MAX, wrapped(&transform).lat, 1e-7);
    assert_near(-LONGITUDE_MAX, wrapped(&transform).lng, 1e-7);
}

#[test]
fn test_constrain_width_and_height() {
    let mut transform = Transform::default();
    transform.set_constrain_mode(ConstrainMode::WidthAndHeight);
    transform.resize(Size::new(2, 2)).unwrap();

    let world = LatLngBounds::world();
    transform.jump_to(&CameraOptions::new().with_center(world.south_west).with_zoom(MAX_ZOOM));
    assert_near(-LATITUDE_MAX, wrapped(&transform).lat, 1e-7);
    assert_near(-LONGITUDE_MAX, wrapped(&transform).lng, 1e-6);

    transform.jump_to(&CameraOptions::new().with_center(world.north_east));
    assert_near(LATITUDE_MAX, wrapped(&transform).lat, 1e-7);
    assert_near(-LONGITUDE_MAX, wrapped(&transform).lng, 1e-6);
}

#[test]
fn test_anchor_keeps_location_under_point() {
    let mut transform = transform(1000, 1000);
    let lat_lng = LatLng::new(10.0, -100.0);
    let anchor = Point::new(150.0, 150.0);

    transform.jump_to(&CameraOptions::new().with_center(lat_lng).with_zoom(10.0));
    assert_near(lat_lng.lat, wrapped(&transform).lat, 1e-9);
    assert_near(lat_lng.lng, wrapped(&transform).lng, 1e-9);

    // Without an anchor, zooming keeps the center.
    transform.jump_to(&CameraOptions::new().with_zoom(3.5));
    assert_near(3.5, transform.zoom(), 1e-12);
    assert_near(lat_lng.lat, wrapped(&transform).lat, 1e-9);
    assert_near(lat_lng.lng, wrapped(&transform).lng, 1e-9);

    let under_anchor = transform.screen_coordinate_to_lat_lng(&anchor, WrapMode::Unwrapped);
    transform.jump_to(&CameraOptions::new().with_zoom(5.5).with_anchor(anchor));
    assert_near(5.5, transform.zoom(), 1e-12);
    assert_ne!(lat_lng.lat, wrapped(&transform).lat);
    assert_ne!(lat_lng.lng, wrapped(&transform).lng);

    let after = transform.screen_coordinate_to_lat_lng(&anchor, WrapMode::Unwrapped);
    assert_near(under_anchor.lat, after.lat, 1e-6);
    assert_near(under_anchor.lng, after.lng, 1e-6);

    transform.jump_to(
        &CameraOptions::new()
            .with_center(lat_lng)
            .with_zoom(10.0)
            .with_bearing(-45.0),
    );
    assert_near(PI / 4.0, transform.bearing(), 1e-12);
    assert_near(lat_lng.lat, wrapped(&transform).lat, 1e-9);

    let under_anchor = transform.screen_coordinate_to_lat_lng(&anchor, WrapMode::Unwrapped);
    transform.jump_to(&CameraOptions::new().with_bearing(45.0).with_anchor(anchor));
    assert_near(-PI / 4.0, transform.bearing(), 1e-12);
    let after = transform.screen_coordinate_to_lat_lng(&anchor, WrapMode::Unwrapped);
    assert_near(under_anchor.lat, after.lat, 1e-6);
    assert_near(under_anchor.lng, after.lng, 1e-6);

    transform.jump_to(
        &CameraOptions::new()
            .with_center(lat_lng)
            .with_bearing(0.0)
            .with_pitch(10.0),
    );
    let under_anchor = transform.screen_coordinate_to_lat_lng(&anchor, WrapMode::Unwrapped);
    transform.jump_to(&CameraOptions::new().with_pitch(20.0).with_anchor(anchor));
    assert_near(20f64.to_radians(), transform.pitch(), 1e-12);
    let after = transform.screen_coordinate_to_lat_lng(&anchor, WrapMode::Unwrapped);
    assert_near(under_anchor.lat, after.lat, 1e-6);
    assert_near(under_anchor.lng, after.lng, 1e-6);
}

#[test]
fn test_center_wins_over_anchor() {
    let mut transform = transform(1000, 1000);
    transform.jump_to(
        &CameraOptions::new()
            .with_center(LatLng::new(-45.0, -135.0))
            .with_zoom(10.0),
    );

    let camera = CameraOptions::new()
        .with_center(LatLng::new(0.0, 0.0))
        .with_anchor(Point::new(0.0, 0.0))
        .with_zoom(transform.state().max_zoom());
    transform.ease_to(&camera, &AnimationOptions::new().with_duration(Duration::from_secs(1)));
    run_transition(&mut transform, &[250, 500, 750]);

    assert_near(0.0, wrapped(&transform).lat, 1e-9);
    assert_near(0.0, wrapped(&transform).lng, 1e-9);
}

fn lat_lng_at(transform: &Transform, x: f64, y: f64) -> LatLng {
    transform.screen_coordinate_to_lat_lng(&Point::new(x, y), WrapMode::Wrapped)
}

#[test]
fn test_padding_shifts_viewport_center() {
    let mut transform = transform(1000, 1000);
    transform.jump_to(&CameraOptions::new().with_center(LatLng::new(10.0, -100.0)).with_zoom(10.0));

    let true_center = wrapped(&transform);
    let screen_center = lat_lng_at(&transform, 500.0, 500.0);
    let upper_half_center = lat_lng_at(&transform, 500.0, 250.0);

    transform.jump_to(&CameraOptions::new().with_padding(EdgeInsets::new(500.0, 0.0, 0.0, 0.0)));
    let same_center = wrapped(&transform);
    assert_near(true_center.lat, same_center.lat, 1e-12);
    assert_near(true_center.lng, same_center.lng, 1e-12);

    let lower_half_center = lat_lng_at(&transform, 500.0, 750.0);
    assert_near(screen_center.lat, lower_half_center.lat, 1e-10);
    assert_near(screen_center.lng, lower_half_center.lng, 1e-10);

    let padded_center = lat_lng_at(&transform, 500.0, 500.0);
    assert_near(upper_half_center.lat, padded_center.lat, 1e-10);
    assert_near(upper_half_center.lng, padded_center.lng, 1e-10);
}

#[test]
fn test_move_by() {
    let mut transform = transform(1000, 1000);
    transform.jump_to(&CameraOptions::new().with_center(LatLng::new(0.0, 0.0)).with_zoom(10.0));

    let mut center = wrapped(&transform);
    for round in 0..20u8 {
        let odd = round % 2 == 1;
        let forward = round % 10 != 0;

        let target = transform.screen_coordinate_to_lat_lng(
            &Point::new(if odd { 400.0 } else { 600.0 }, if forward { 400.0 } else { 600.0 }),
            WrapMode::Wrapped,
        );
        transform.move_by(
            &Point::new(if odd { 100.0 } else { -100.0 }, if forward { 100.0 } else { -100.0 }),
            &AnimationOptions::default(),
        );

        center = wrapped(&transform);
        assert_near(target.lat, center.lat, 1e-8);
        assert_near(target.lng, center.lng, 1e-8);
    }

    assert_near(0.0, center.lat, 1.1);
    assert_near(0.0, center.lng, 1.1);
}

#[test]
fn test_antimeridian() {
    let mut transform = transform(1000, 1000);
    transform.jump_to(&CameraOptions::new().with_center(LatLng::new(0.0, 0.0)).with_zoom(1.0));

    let san_francisco = LatLng::new(37.7833, -122.4167);
    let pixel = transform.lat_lng_to_screen_coordinate(&san_francisco);
    assert_near(151.79249437176432, pixel.x, 1e-9);
    assert_near(383.76720782527661, pixel.y, 1e-9);

    transform.jump_to(&CameraOptions::new().with_center(LatLng::new(0.0, -181.0)));
    let longest = transform.lat_lng_to_screen_coordinate(&san_francisco);
    assert_near(-357.36306616412816, longest.x, 1e-9);
    assert_near(pixel.y, longest.y, 1e-9);

    let mut unwrapped = san_francisco.wrapped();
    unwrapped.unwrap_for_shortest_path(&wrapped(&transform));
    let shortest = transform.lat_lng_to_screen_coordinate(&unwrapped);
    assert_near(666.63694385219173, shortest.x, 1e-9);
    assert_near(pixel.y, shortest.y, 1e-9);

    transform.jump_to(&CameraOptions::new().with_center(LatLng::new(0.0, 179.0)));
    let same = transform.lat_lng_to_screen_coordinate(&san_francisco);
    assert_near(longest.x, same.x, 1e-9);
    assert_near(longest.y, same.y, 1e-9);

    let waikiri = LatLng::new(-16.9310, 179.9787);
    transform.jump_to(&CameraOptions::new().with_center(waikiri).with_zoom(10.0));
    let pixel = transform.lat_lng_to_screen_coordinate(&waikiri);
    assert_near(500.0, pixel.x, 1e-6);
    assert_near(500.0, pixel.y, 1e-6);

    transform.jump_to(&CameraOptions::new().with_center(LatLng::new(waikiri.lat, 180.0213)));
    let longest = transform.lat_lng_to_screen_coordinate(&waikiri);
    assert_near(524725.96438108233, longest.x, 1e-6);
    assert_near(pixel.y, longest.y, 1e-6);

    let mut unwrapped = waikiri.wrapped();
    unwrapped.unwrap_for_shortest_path(&wrapped(&transform));
    let shortest = transform.lat_lng_to_screen_coordinate(&unwrapped);
    assert_near(437.95925272648344, shortest.x, 1e-6);
    assert_near(pixel.y, shortest.y, 1e-6);

    let back = transform.screen_coordinate_to_lat_lng(&longest, WrapMode::Wrapped);
    assert_near(waikiri.lat, back.lat, 1e-4);
    assert_near(waikiri.lng, back.lng, 1e-4);
}

#[test]
fn test_camera_ease_and_fly() {
    let mut transform = transform(1000, 1000);

    let first = LatLng::new(45.0, 135.0);
    let first_camera = CameraOptions::new().with_center(first).with_zoom(20.0);
    transform.jump_to(&first_camera);
    assert_near(first.lat, wrapped(&transform).lat, 1e-9);
    assert_near(first.lng, wrapped(&transform).lng, 1e-9);
    assert_near(20.0, transform.zoom(), 1e-12);

    let second = LatLng::new(-45.0, -135.0);
    let second_camera = CameraOptions::new().with_center(second).with_zoom(10.0);
    transform.jump_to(&second_camera);
    assert_near(10.0, transform.zoom(), 1e-12);

    let finished = Rc::new(Cell::new(0));
    let frames = Rc::new(Cell::new(0));
    let options = {
        let finished = finished.clone();
        let frames = frames.clone();
        AnimationOptions::new()
            .with_duration(Duration::from_secs(1))
            .on_frame(move |t| {
                assert!((0.0..=1.0).contains(&t));
                frames.set(frames.get() + 1);
            })
            .on_finish(move || finished.set(finished.get() + 1))
    };

    transform.ease_to(&first_camera, &options);
    assert!(transform.in_transition());
    let start = transform.transition_start().unwrap();
    for offset in [250, 500, 750] {
        transform.update_transitions(start + Duration::from_millis(offset));
        let center = wrapped(&transform);
        assert!(center.lat <= first.lat);
        assert!(center.lat >= second.lat);
    }
    transform.update_transitions(start + transform.transition_duration());
    assert!(!transform.in_transition());
    assert_eq!(finished.get(), 1);
    assert_eq!(frames.get(), 3);
    assert_near(first.lat, wrapped(&transform).lat, 1e-9);
    assert_near(first.lng, wrapped(&transform).lng, 1e-9);
    assert_near(20.0, transform.zoom(), 1e-12);

    transform.fly_to(&second_camera, &options);
    assert!(transform.in_transition());
    let start = transform.transition_start().unwrap();
    for offset in [250, 500, 750] {
        transform.update_transitions(start + Duration::from_millis(offset));
        assert!(wrapped(&transform).lat >= second.lat);
    }
    transform.update_transitions(start + transform.transition_duration());
    assert!(!transform.in_transition());
    assert_eq!(finished.get(), 2);
    assert_near(second.lat, wrapped(&transform).lat, 1e-9);
    assert_near(second.lng, wrapped(&transform).lng, 1e-9);
    assert_near(10.0, transform.zoom(), 1e-5);
}

#[test]
fn test_projection_mode() {
    let mut transform = Transform::default();
    transform.set_projection_mode(
        &ProjectionMode::default()
            .with_axonometric(true)
            .with_x_skew(1.0)
            .with_y_skew(0.0),
    );
    let mode = transform.projection_mode();
    assert_eq!(mode.axonometric, Some(true));
    assert_eq!(mode.x_skew, Some(1.0));
    assert_eq!(mode.y_skew, Some(0.0));
}

#[test]
fn test_is_panning_during_pan() {
    let mut transform = transform(1000, 1000);
    transform.ease_to(
        &CameraOptions::new().with_center(LatLng::new(0.0, 90.0)),
        &AnimationOptions::new().with_duration(Duration::from_secs(1)),
    );
    let start = transform.transition_start().unwrap();
    for offset in [250, 500, 750] {
        transform.update_transitions(start + Duration::from_millis(offset));
        assert!(transform.state().is_panning());
    }
    transform.update_transitions(start + transform.transition_duration());
    assert!(!transform.state().is_panning());
    assert!(!transform.in_transition());
}

#[derive(Default)]
struct Counts {
    will: Cell<u32>,
    did: Cell<u32>,
}

struct CountingObserver(Rc<Counts>);

impl TransformObserver for CountingObserver {
    fn on_camera_will_change(&mut self, _mode: CameraChangeMode) {
        self.0.will.set(self.0.will.get() + 1);
    }

    fn on_camera_did_change(&mut self, _mode: CameraChangeMode) {
        self.0.did.set(self.0.did.get() + 1);
    }
}

#[test]
fn test_default_transform() {
    let counts = Rc::new(Counts::default());
    let mut transform = Transform::with_observer(
        &TransformOptions::default(),
        Box::new(CountingObserver(counts.clone())),
    );
    assert!(!transform.state().valid());

    for size in [Size::default(), Size::new(0, 65535), Size::new(65535, 0)] {
        assert!(matches!(transform.resize(size), Err(TransformError::EmptySize)));
    }

    let valid = Size::new(65535, 65535);
    transform.resize(valid).unwrap();
    assert_eq!(counts.will.get(), 1);
    assert_eq!(counts.did.get(), 1);
    assert!(transform.state().valid());

    // Same size again is a no-op.
    transform.resize(valid).unwrap();
    assert_eq!(counts.will.get(), 1);
    assert_eq!(counts.did.get(), 1);

    let center = Point::new(65535.0 / 2.0, 65535.0 / 2.0);
    let null_island = transform.state().screen_coordinate_to_lat_lng(&center, WrapMode::Unwrapped);
    assert_near(0.0, null_island.lat, 1e-8);
    assert_near(0.0, null_island.lng, 1e-8);

    let point = transform.state().lat_lng_to_screen_coordinate(&LatLng::new(0.0, 0.0));
    assert_near(center.x, point.x, 1e-9);
    assert_near(center.y, point.y, 1e-9);
}

#[test]
fn test_resize_under_screen_constraint_stops_transition() {
    // The huge viewport leaves the zoom raised once it shrinks again.
    let mut transform = transform(65535, 65535);
    transform.resize(Size::new(1000, 500)).unwrap();
    transform
        .set_lat_lng_bounds(LatLngBounds::hull(LatLng::new(40.0, -10.0), LatLng::new(70.0, 40.0)))
        .unwrap();
    transform.set_constrain_mode(ConstrainMode::Screen);

    transform.ease_to(
        &CameraOptions::new().with_center(LatLng::new(56.0, 11.0)).with_zoom(1.0),
        &AnimationOptions::new().with_duration(Duration::from_secs(1)),
    );
    assert!(transform.in_transition());
    let start = transform.transition_start().unwrap();
    transform.update_transitions(start + Duration::from_millis(250));

    transform.resize(Size::new(500, 1000)).unwrap();
    assert!(!transform.in_transition());
    assert_near(8.22103, wrapped(&transform).lng, 1e-4);
    assert_near(46.6905, wrapped(&transform).lat, 1e-4);
    assert_near(38.1529, transform.state().scale(), 1e-4);
}

#[test]
fn test_lat_lng_bounds() {
    let san_francisco = LatLng::new(37.7749, -122.4194);
    let mut transform = transform(1000, 1000);
    let max_zoom = transform.state().max_zoom();
    transform.jump_to(&CameraOptions::new().with_center(LatLng::new(0.0, 0.0)).with_zoom(max_zoom));

    assert_eq!(transform.state().lat_lng_bounds(), LatLngBounds::default());
    assert_eq!(wrapped(&transform), LatLng::new(0.0, 0.0));

    assert!(matches!(
        transform.set_lat_lng_bounds(LatLngBounds::empty()),
        Err(TransformError::InvalidBounds)
    ));
    assert_eq!(transform.state().lat_lng_bounds(), LatLngBounds::default());

    transform.jump_to(&CameraOptions::new().with_center(san_francisco));
    assert_near(san_francisco.lat, wrapped(&transform).lat, 1e-8);
    assert_near(san_francisco.lng, wrapped(&transform).lng, 1e-8);

    // A single location pins the center.
    transform.set_lat_lng_bounds(LatLngBounds::singleton(san_francisco)).unwrap();
    assert_near(san_francisco.lat, wrapped(&transform).lat, 1e-8);
    assert_near(san_francisco.lng, wrapped(&transform).lng, 1e-8);

    // Southern hemisphere only.
    transform
        .set_lat_lng_bounds(LatLngBounds::hull(LatLng::new(-90.0, -180.0), LatLng::new(0.0, 180.0)))
        .unwrap();
    transform.jump_to(&CameraOptions::new().with_center(san_francisco));
    assert_near(0.0, wrapped(&transform).lat, 1e-8);
    assert_near(san_francisco.lng, wrapped(&transform).lng, 1e-8);

    transform.jump_to(&CameraOptions::new().with_center(LatLng::new(0.0, -200.0)));
    assert_near(-180.0, wrapped(&transform).lng, 1e-8);

    transform.jump_to(&CameraOptions::new().with_center(LatLng::new(0.0, 200.0)));
    assert_near(180.0, transform.lat_lng(WrapMode::Unwrapped).lng, 1e-8);
    assert_near(-180.0, wrapped(&transform).lng, 1e-8);

    // Eastern hemisphere only.
    transform
        .set_lat_lng_bounds(LatLngBounds::hull(LatLng::new(-90.0, 0.0), LatLng::new(90.0, 180.0)))
        .unwrap();
    transform.jump_to(&CameraOptions::new().with_center(san_francisco));
    assert_near(san_francisco.lat, wrapped(&transform).lat, 1e-8);
    assert_near(0.0, wrapped(&transform).lng, 1e-8);

    // Bounds straddling the antimeridian.
    let inside = LatLng::new(45.0, 150.0);
    transform
        .set_lat_lng_bounds(LatLngBounds::hull(LatLng::new(0.0, 120.0), LatLng::new(90.0, 240.0)))
        .unwrap();
    transform.jump_to(&CameraOptions::new().with_center(inside));
    assert_near(inside.lat, wrapped(&transform).lat, 1e-8);
    assert_near(inside.lng, wrapped(&transform).lng, 1e-8);

    transform.jump_to(&CameraOptions::new().with_center(LatLng::new(-45.0, inside.lng)));
    assert_near(0.0, wrapped(&transform).lat, 1e-8);
    assert_near(inside.lng, wrapped(&transform).lng, 1e-8);

    transform.jump_to(&CameraOptions::new().with_center(LatLng::new(inside.lat, 181.0)));
    assert_near(-179.0, wrapped(&transform).lng, 1e-8);

    transform.jump_to(&CameraOptions::new().with_center(inside));
    transform.jump_to(&CameraOptions::new().with_center(LatLng::new(inside.lat, 250.0)));
    assert_near(-120.0, wrapped(&transform).lng, 1e-8);

    transform.jump_to(&CameraOptions::new().with_center(LatLng::new(inside.lat, 119.0)));
    assert_near(120.0, wrapped(&transform).lng, 1e-8);

    // A swipe past the left edge stays pinned to it.
    transform.move_by(
        &Point::new(-500.0, -500.0),
        &AnimationOptions::new().with_duration(Duration::from_secs(1)),
    );
    let start = transform.transition_start().unwrap();
    for offset in [0, 250, 500, 750] {
        transform.update_transitions(start + Duration::from_millis(offset));
        assert_near(120.0, wrapped(&transform).lng, 1e-4);
    }
    transform.update_transitions(start + transform.transition_duration());
    assert_near(120.0, wrapped(&transform).lng, 1e-4);

    transform.jump_to(&CameraOptions::new().with_center(LatLng::new(inside.lat, 241.0)));
    assert_near(-120.0, wrapped(&transform).lng, 1e-8);

    // Western bounds straddling the antimeridian.
    let inside = LatLng::new(-45.0, -150.0);
    transform
        .set_lat_lng_bounds(LatLngBounds::hull(
            LatLng::new(-90.0, -240.0),
            LatLng::new(0.0, -120.0),
        ))
        .unwrap();
    transform.jump_to(&CameraOptions::new().with_center(inside));
    assert_near(inside.lat, wrapped(&transform).lat, 1e-8);
    assert_near(inside.lng, wrapped(&transform).lng, 1e-8);

    transform.jump_to(&CameraOptions::new().with_center(LatLng::new(inside.lat, -181.0)));
    assert_near(179.0, wrapped(&transform).lng, 1e-8);

    transform.jump_to(&CameraOptions::new().with_center(LatLng::new(inside.lat, -119.0)));
    assert_near(-120.0, wrapped(&transform).lng, 1e-8);
    transform.move_by(&Point::new(-500.0, 0.0), &AnimationOptions::default());
    assert_near(-120.0, wrapped(&transform).lng, 1e-8);

    transform.jump_to(&CameraOptions::new().with_center(LatLng::new(inside.lat, -241.0)));
    assert_near(120.0, wrapped(&transform).lng, 1e-8);
    transform.move_by(&Point::new(500.0, 0.0), &AnimationOptions::default());
    assert_near(120.0, wrapped(&transform).lng, 1e-8);
}

#[test]
fn test_constrain_screen_to_bounds() {
    let mut transform = transform(500, 500);
    transform
        .set_lat_lng_bounds(LatLngBounds::hull(LatLng::new(40.0, -10.0), LatLng::new(70.0, 40.0)))
        .unwrap();
    transform.set_constrain_mode(ConstrainMode::Screen);
    let instant = AnimationOptions::default();

    // Too far out to fit the bounds.
    transform.ease_to(
        &CameraOptions::new()
            .with_center(LatLng::new(56.0, 11.0))
            .with_zoom(1.0),
        &instant,
    );
    assert_near(2.81378, transform.zoom(), 1e-4);

    let cases = [
        (LatLng::new(56.0, -65.0), 0.98632, 56.0),
        (LatLng::new(80.0, 11.0), 11.0, 65.88603),
        (LatLng::new(56.0, 50.0), 29.01367, 56.0),
        (LatLng::new(30.0, 11.0), 11.0, 47.89217),
    ];
    for (center, lng, lat) in cases {
        transform.ease_to(&CameraOptions::new().with_center(center).with_zoom(4.0), &instant);
        assert_near(lng, wrapped(&transform).lng, 1e-4);
        assert_near(lat, wrapped(&transform).lat, 1e-4);
    }

    transform.ease_to(
        &CameraOptions::new()
            .with_anchor(Point::new(250.0, 250.0))
            .with_center(LatLng::new(56.0, -65.0))
            .with_zoom(4.0),
        &instant,
    );
    assert_near(0.98632, wrapped(&transform).lng, 1e-4);
    assert_near(56.0, wrapped(&transform).lat, 1e-4);

    transform.ease_to(
        &CameraOptions::new().with_anchor(Point::new(250.0, 250.0)).with_zoom(4.0),
        &instant,
    );
    assert_near(0.98632, wrapped(&transform).lng, 1e-4);
    assert_near(56.0, wrapped(&transform).lat, 1e-4);

    // A fly only moves once it is stepped.
    for zoom in [4.0, 2.0] {
        transform.fly_to(
            &CameraOptions::new().with_center(LatLng::new(56.0, -65.0)).with_zoom(zoom),
            &instant,
        );
        assert_near(4.0, transform.zoom(), 1e-4);
        assert_near(0.98632, wrapped(&transform).lng, 1e-4);
        assert_near(56.0, wrapped(&transform).lat, 1e-4);
    }
}

#[test]
fn test_oversized_viewport_centers_on_bounds() {
    let instant = AnimationOptions::default();

    // Narrower than the screen in longitude.
    let mut transform = transform_for_bounds(LatLng::new(40.0, -10.0), LatLng::new(70.0, 40.0));
    transform.ease_to(
        &CameraOptions::new().with_center(LatLng::new(56.0, -5.0)).with_zoom(1.0),
        &instant,
    );
    assert!(transform.zoom() > 1.0);
    assert_near(15.0, wrapped(&transform).lng, 1e-6);

    // Shorter than the screen in latitude; the midpoint is taken in mercator y.
    let mut transform = transform_for_bounds(LatLng::new(40.0, -60.0), LatLng::new(50.0, 60.0));
    transform.ease_to(
        &CameraOptions::new().with_center(LatLng::new(41.0, 0.0)).with_zoom(1.0),
        &instant,
    );
    assert!(transform.zoom() > 1.0);
    assert_near(45.219281, wrapped(&transform).lat, 1e-6);
}

fn transform_for_bounds(south_west: LatLng, north_east: LatLng) -> Transform {
    let mut transform = transform(500, 500);
    transform
        .set_lat_lng_bounds(LatLngBounds::hull(south_west, north_east))
        .unwrap();
    transform.set_constrain_mode(ConstrainMode::Screen);
    transform
}

#[test]
fn test_invalid_pitch_is_ignored() {
    let mut transform = transform(1, 1);
    transform.jump_to(&CameraOptions::new().with_zoom(1.0).with_pitch(45.0));
    assert_near(1.0, transform.zoom(), 1e-12);
    assert_near(45f64.to_radians(), transform.pitch(), 1e-12);

    transform.jump_to(&CameraOptions::new().with_pitch(f64::NAN));
    assert_near(45f64.to_radians(), transform.pitch(), 1e-12);

    transform.jump_to(&CameraOptions::new().with_pitch(60.0));
    assert_near(60f64.to_radians(), transform.pitch(), 1e-12);
}

#[test]
fn test_min_max_pitch() {
    let mut transform = transform(1, 1);

    transform.jump_to(&CameraOptions::new().with_zoom(1.0).with_pitch(60.0));
    assert_near(transform.state().max_pitch(), transform.pitch(), 1e-12);
    assert_near(60f64.to_radians(), transform.pitch(), 1e-12);

    // Above the hard limit, so the limit stays.
    transform.set_max_pitch(70.0);
    transform.jump_to(&CameraOptions::new().with_pitch(70.0));
    assert_near(60f64.to_radians(), transform.pitch(), 1e-12);

    transform.set_max_pitch(45.0);
    transform.jump_to(&CameraOptions::new().with_pitch(60.0));
    assert_near(45f64.to_radians(), transform.pitch(), 1e-12);

    transform.jump_to(&CameraOptions::new().with_pitch(0.0));
    assert_near(transform.state().min_pitch(), transform.pitch(), 1e-12);

    transform.set_min_pitch(-10.0);
    transform.jump_to(&CameraOptions::new().with_pitch(-10.0));
    assert_near(0.0, transform.pitch(), 1e-12);

    transform.set_min_pitch(15.0);
    transform.jump_to(&CameraOptions::new().with_pitch(0.0));
    assert_near(15f64.to_radians(), transform.pitch(), 1e-12);

    transform.set_min_pitch(45.0);
    assert_near(45f64.to_radians(), transform.state().min_pitch(), 1e-12);
    transform.set_max_pitch(45.0);
    assert_near(45f64.to_radians(), transform.state().max_pitch(), 1e-12);

    // Inverted limits are rejected.
    transform.set_max_pitch(10.0);
    assert_near(45f64.to_radians(), transform.state().max_pitch(), 1e-12);
    transform.set_min_pitch(60.0);
    assert_near(45f64.to_radians(), transform.state().min_pitch(), 1e-12);
}
