//! `render` subcommand: simulate the demo for a fixed number of frames and
//! write the final frame to disk.

use std::path::Path;

use anyhow::{Context, Result};
use glam::Vec3;
use mirrorpass_render::engine::SceneHandle;
use mirrorpass_render::ledger::ResourceLedger;
use mirrorpass_render::{CameraPose, FrameOutcome, MirrorConfig, MirrorContext, PrimaryCamera};
use mirrorpass_wgpu::WgpuEngine;

use crate::cli::RenderArgs;
use crate::scene::{demo_lighting, orbit_eye, DemoObject, PrimaryView};

fn save_png(image: &image::RgbaImage, path: &Path) -> Result<()> {
    image
        .save(path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    log::info!("Wrote {}x{} image to {}", image.width(), image.height(), path.display());
    Ok(())
}

/// Primary camera at simulation time `now`, orbiting the target when requested.
fn primary_camera(args: &RenderArgs, now: f64) -> PrimaryCamera {
    let target = Vec3::from_array(args.target);
    let mut eye = Vec3::from_array(args.eye);
    if let Some(degrees_per_second) = args.orbit {
        eye = orbit_eye(eye, target, (degrees_per_second * now).to_radians() as f32);
    }
    PrimaryCamera::new(CameraPose::look_at(eye, target, Vec3::Y), args.focal_length)
}

pub fn run(args: &RenderArgs, config: &MirrorConfig) -> Result<()> {
    let mut engine = WgpuEngine::new_headless().context("failed to initialize the wgpu backend")?;
    render_demo(&mut engine, args, config)
}

/// Build the demo scene, render it and release everything it created,
/// whether or not rendering succeeded.
fn render_demo(engine: &mut WgpuEngine, args: &RenderArgs, config: &MirrorConfig) -> Result<()> {
    let scene = engine.create_scene();
    engine.set_scene_lighting(scene, demo_lighting())?;

    let object = DemoObject::new(engine, scene)?;
    let mut ledger = ResourceLedger::new();

    let result = render_with_mirror(engine, &mut ledger, scene, &object, args, config);

    object.release(engine, scene);
    ledger.release_all(engine);
    result
}

fn render_with_mirror(
    engine: &mut WgpuEngine,
    ledger: &mut ResourceLedger,
    scene: SceneHandle,
    object: &DemoObject,
    args: &RenderArgs,
    config: &MirrorConfig,
) -> Result<()> {
    let primary_view = PrimaryView::new(
        engine,
        ledger,
        scene,
        (args.width, args.height),
        config.offscreen.clear_color,
    )?;
    let mut mirror = MirrorContext::setup(engine, scene, config)?;

    let result = simulate(engine, &mut mirror, &primary_view, object, args, config);
    if let Err(err) = &result {
        log::error!("Render aborted: {err:#}");
    }

    mirror.teardown(engine);
    result
}

fn simulate(
    engine: &mut WgpuEngine,
    mirror: &mut MirrorContext,
    primary_view: &PrimaryView,
    object: &DemoObject,
    args: &RenderArgs,
    config: &MirrorConfig,
) -> Result<()> {
    let (near, far) = (config.projection.near, config.projection.far);
    let dt = 1.0 / args.fps;
    let mut primary = primary_camera(args, 0.0);
    primary_view.aim(engine, &primary, near, far)?;

    for frame in 0..args.frames {
        let now = frame as f64 * dt;
        if args.orbit.is_some() {
            primary = primary_camera(args, now);
            primary_view.aim(engine, &primary, near, far)?;
        }
        object.animate(engine, now)?;
        if mirror.frame(engine, now, &primary, primary_view.view)? == FrameOutcome::Held {
            log::warn!("Frame {frame}: primary camera looks along the mirror plane");
        }
    }

    let stats = mirror.stats();
    log::info!("Rendered {} frames ({} held)", stats.frames, stats.held);

    save_png(&engine.read_texture(primary_view.color)?, &args.output)?;
    if let Some(path) = &args.dump_mirror {
        save_png(&engine.read_texture(mirror.offscreen().texture())?, path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::cli::{Cli, Command};

    fn render_args(extra: &[&str]) -> RenderArgs {
        let argv = ["mirrorpass", "render"].iter().chain(extra).copied();
        match Cli::try_parse_from(argv).unwrap().command {
            Command::Render(args) => args,
            Command::Config { .. } => panic!("expected render"),
        }
    }

    #[test]
    fn test_fixed_camera_ignores_time() {
        let args = render_args(&[]);
        assert_eq!(primary_camera(&args, 0.0).pose, primary_camera(&args, 3.0).pose);
    }

    #[test]
    fn test_orbiting_camera_moves_and_keeps_target() {
        let args = render_args(&["--orbit", "90"]);
        let start = primary_camera(&args, 0.0);
        let later = primary_camera(&args, 1.0);
        let target = Vec3::from_array(args.target);

        assert!(start.pose.eye.abs_diff_eq(Vec3::from_array(args.eye), 1e-5));
        assert!(!later.pose.eye.abs_diff_eq(start.pose.eye, 1e-3));
        assert!((later.pose.eye.distance(target) - start.pose.eye.distance(target)).abs() < 1e-4);
        let to_target = (target - later.pose.eye).normalize();
        assert!(later.pose.forward.abs_diff_eq(to_target, 1e-4));
        assert_eq!(later.focal_length_mm, args.focal_length);
    }

    fn headless() -> Option<WgpuEngine> {
        let _ = env_logger::builder().is_test(true).try_init();
        match WgpuEngine::new_headless() {
            Ok(engine) => Some(engine),
            Err(err) => {
                eprintln!("skipping: {err}");
                None
            }
        }
    }

    fn small_config() -> MirrorConfig {
        let mut config = MirrorConfig::default();
        config.offscreen.width = 32;
        config.offscreen.height = 32;
        config
    }

    #[test]
    fn test_render_releases_everything_on_success() {
        let Some(mut engine) = headless() else { return };
        let output = std::env::temp_dir().join("mirrorpass-render-success.png");
        let output_arg = output.to_string_lossy().into_owned();
        let args = render_args(&["-n", "2", "--width", "16", "--height", "16", "-o", &output_arg]);

        render_demo(&mut engine, &args, &small_config()).unwrap();

        assert_eq!(engine.live_resources(), 0);
        assert_eq!(image::open(&output).unwrap().width(), 16);
        let _ = std::fs::remove_file(output);
    }

    #[test]
    fn test_render_releases_everything_when_output_fails() {
        let Some(mut engine) = headless() else { return };
        let output = std::env::temp_dir()
            .join("mirrorpass-missing-dir")
            .join("nested")
            .join("frame.png");
        let output_arg = output.to_string_lossy().into_owned();
        let args = render_args(&["-n", "1", "--width", "16", "--height", "16", "-o", &output_arg]);

        assert!(render_demo(&mut engine, &args, &small_config()).is_err());
        assert_eq!(engine.live_resources(), 0);
    }
}
