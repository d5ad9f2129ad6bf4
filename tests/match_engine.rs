use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rotmatch::kernel::{Kernel, ZnccScalar};
use rotmatch::template::rotate::rotate_u8_bicubic;
use rotmatch::{
    angular_distance_deg, Frame, MatchEngine, OwnedImage, RotMatchError, Template,
    TemplateVariant, VariantLibrary,
};
use std::time::{Duration, Instant};

const TPL: usize = 16;

/// Asymmetric "L" of two brightnesses on a mid-dark background.
fn l_shape() -> Template {
    let mut data = vec![40u8; TPL * TPL];
    for y in 3..6 {
        for x in 3..13 {
            data[y * TPL + x] = 220;
        }
    }
    for y in 6..13 {
        for x in 3..6 {
            data[y * TPL + x] = 160;
        }
    }
    Template::new(data, TPL, TPL).unwrap()
}

fn noise(width: usize, height: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..width * height).map(|_| rng.random::<u8>()).collect()
}

fn paste(canvas: &mut [u8], canvas_width: usize, img: &OwnedImage, x0: usize, y0: usize) {
    for y in 0..img.height() {
        let src = &img.data()[y * img.width()..(y + 1) * img.width()];
        let start = (y0 + y) * canvas_width + x0;
        canvas[start..start + img.width()].copy_from_slice(src);
    }
}

fn scene(angle_deg: f32, x0: usize, y0: usize, seed: u64) -> Frame {
    let (width, height) = (64, 56);
    let mut canvas = noise(width, height, seed);
    let rotated = rotate_u8_bicubic(l_shape().view(), angle_deg, 0);
    paste(&mut canvas, width, &rotated, x0, y0);
    Frame::new(OwnedImage::new(canvas, width, height).unwrap())
}

#[test]
fn unrotated_reference_matches_itself_perfectly() {
    let reference = l_shape();
    let library = VariantLibrary::build(&reference, 360).unwrap();
    let frame = Frame::from_view(reference.view());
    let engine = MatchEngine::new(2).unwrap();

    let best = engine.match_all(&frame, &library).unwrap();
    assert_eq!(best.score, 1.0);
    assert_eq!((best.x, best.y), (0, 0));
    assert_eq!(best.angle_deg, 0);
}

#[test]
fn recovers_on_grid_rotation_and_offset() {
    let library = VariantLibrary::build(&l_shape(), 10).unwrap();
    let engine = MatchEngine::new(4).unwrap();

    for (angle, x0, y0) in [(40.0f32, 21, 17), (250.0, 5, 33)] {
        let best = engine
            .match_all(&scene(angle, x0, y0, 11), &library)
            .unwrap();
        assert_eq!(best.angle_deg, angle as u32);
        assert_eq!((best.x, best.y), (x0, y0));
        assert_eq!(best.score, 1.0);
    }
}

#[test]
fn recovers_off_grid_rotation_within_one_step() {
    let step = 5;
    let library = VariantLibrary::build(&l_shape(), step).unwrap();
    let engine = MatchEngine::new(8).unwrap();
    let (x0, y0) = (30, 12);

    let best = engine.match_all(&scene(132.0, x0, y0, 3), &library).unwrap();
    assert!(
        angular_distance_deg(best.angle_deg as f32, 132.0) <= step as f32,
        "angle {}",
        best.angle_deg
    );
    assert!(best.x.abs_diff(x0) <= 1 && best.y.abs_diff(y0) <= 1, "{best:?}");
    assert!(best.score > 0.8, "score {}", best.score);
}

#[test]
fn equal_scores_resolve_to_the_lowest_angle() {
    let reference = l_shape();
    let img = OwnedImage::from_view(reference.view());
    let library = VariantLibrary::from_variants(vec![
        TemplateVariant::new(90, img.clone()).unwrap(),
        TemplateVariant::new(10, img.clone()).unwrap(),
        TemplateVariant::new(200, img).unwrap(),
    ])
    .unwrap();
    let engine = MatchEngine::new(3).unwrap();
    let frame = scene(0.0, 9, 9, 5);

    for _ in 0..5 {
        let best = engine.match_all(&frame, &library).unwrap();
        assert_eq!(best.angle_deg, 10);
        assert_eq!((best.x, best.y), (9, 9));
    }
}

#[test]
fn frame_without_target_stays_below_acceptance() {
    let library = VariantLibrary::build(&l_shape(), 10).unwrap();
    let engine = MatchEngine::new(8).unwrap();

    for seed in [1u64, 2, 3] {
        let frame = Frame::new(OwnedImage::new(noise(64, 56, seed), 64, 56).unwrap());
        let best = engine.match_all(&frame, &library).unwrap();
        assert!(best.score < rotmatch::ACCEPTANCE_THRESHOLD, "score {}", best.score);
        assert!(!best.is_accepted(rotmatch::ACCEPTANCE_THRESHOLD));
    }
}

#[test]
fn pool_width_does_not_change_the_answer() {
    let library = VariantLibrary::build(&l_shape(), 10).unwrap();
    let serial = MatchEngine::new(1).unwrap();
    let parallel = MatchEngine::new(8).unwrap();

    for frame in [
        scene(70.0, 12, 30, 9),
        scene(133.0, 40, 2, 10),
        Frame::new(OwnedImage::new(noise(64, 56, 12), 64, 56).unwrap()),
    ] {
        let a = serial.match_all(&frame, &library).unwrap();
        let b = parallel.match_all(&frame, &library).unwrap();
        assert_eq!(a.score.to_bits(), b.score.to_bits());
        assert_eq!((a.x, a.y, a.angle_deg), (b.x, b.y, b.angle_deg));
    }
}

#[test]
fn engine_is_reused_across_calls() {
    let library = VariantLibrary::build(&l_shape(), 30).unwrap();
    let engine = MatchEngine::new(2).unwrap();
    let first = engine.match_all(&scene(60.0, 4, 4, 21), &library).unwrap();
    let second = engine.match_all(&scene(120.0, 40, 30, 22), &library).unwrap();
    assert_eq!((first.angle_deg, first.x, first.y), (60, 4, 4));
    assert_eq!((second.angle_deg, second.x, second.y), (120, 40, 30));
}

#[test]
fn empty_library_and_oversized_templates_are_errors() {
    let engine = MatchEngine::new(2).unwrap();
    let small = Frame::new(OwnedImage::new(noise(8, 8, 4), 8, 8).unwrap());

    assert_eq!(
        engine.match_all(&small, &VariantLibrary::empty()).unwrap_err(),
        RotMatchError::NoTemplates
    );

    let library = VariantLibrary::build(&l_shape(), 90).unwrap();
    assert!(matches!(
        engine.match_all(&small, &library),
        Err(RotMatchError::TemplateLargerThanFrame { .. })
    ));
}

#[test]
fn engine_agrees_with_exhaustive_direct_scan() {
    let library = VariantLibrary::build(&l_shape(), 15).unwrap();
    let engine = MatchEngine::new(4).unwrap();
    let (width, height) = (160, 120);

    for (seed, angle, x0, y0) in [
        (31u64, 45.0f32, 97, 61),
        (32, 200.0, 3, 100),
        (33, 7.0, 140, 0),
    ] {
        let mut canvas = noise(width, height, seed);
        paste(&mut canvas, width, &rotate_u8_bicubic(l_shape().view(), angle, 0), x0, y0);
        let frame = Frame::new(OwnedImage::new(canvas, width, height).unwrap());

        let mut direct = None::<rotmatch::Peak>;
        for variant in library.variants() {
            let plan = variant.plan().unwrap();
            let peak =
                ZnccScalar::scan_best(frame.view(), frame.integral(), plan, variant.angle_deg())
                    .unwrap();
            let better = match &direct {
                Some(best) => {
                    peak.score > best.score
                        || (peak.score == best.score && peak.angle_deg < best.angle_deg)
                }
                None => true,
            };
            if better {
                direct = Some(peak);
            }
        }
        let direct = direct.unwrap();

        let best = engine.match_all(&frame, &library).unwrap();
        assert_eq!(best.score.to_bits(), direct.score.to_bits());
        assert_eq!(
            (best.x, best.y, best.angle_deg),
            (direct.x, direct.y, direct.angle_deg)
        );
    }
}

/// Latency of one 1280x720 frame against 72 variants of a 24x24 target.
///
/// Timing depends on the host, so this only runs on request:
/// `cargo test --release -- --ignored hd_frame`.
#[test]
#[ignore]
fn hd_frame_with_72_variants_reports_latency() {
    const SIZE: usize = 24;
    const BUDGET: Duration = Duration::from_millis(100);
    let (width, height) = (1280, 720);

    let mut data = noise(SIZE, SIZE, 40);
    for y in 4..8 {
        for x in 4..20 {
            data[y * SIZE + x] = 250;
        }
    }
    let reference = Template::new(data, SIZE, SIZE).unwrap();
    let library = VariantLibrary::build(&reference, 5).unwrap();
    assert_eq!(library.len(), 72);

    let mut canvas = noise(width, height, 41);
    paste(
        &mut canvas,
        width,
        &rotate_u8_bicubic(reference.view(), 35.0, 0),
        911,
        402,
    );
    let engine = MatchEngine::new(rotmatch::DEFAULT_WORKERS).unwrap();

    let mut elapsed = Vec::new();
    for _ in 0..3 {
        let frame = Frame::new(OwnedImage::new(canvas.clone(), width, height).unwrap());
        let start = Instant::now();
        let best = engine.match_all(&frame, &library).unwrap();
        elapsed.push(start.elapsed());
        assert_eq!((best.x, best.y, best.angle_deg), (911, 402, 35));
    }
    let fastest = elapsed.iter().min().copied().unwrap_or_default();
    println!(
        "1280x720, 72 variants of {SIZE}x{SIZE}, {} workers: {fastest:?} (budget {BUDGET:?})",
        engine.workers()
    );
}
