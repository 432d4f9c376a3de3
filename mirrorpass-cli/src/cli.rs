use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "mirrorpass",
    about = "Planar mirror reflections rendered in two passes",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Render the demo scene headlessly and write the final frame as PNG
    Render(RenderArgs),
    /// Print the effective mirror configuration
    Config {
        /// TOML file overriding the built-in mirror settings
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
pub struct RenderArgs {
    /// Number of frames to simulate
    #[arg(short = 'n', long, default_value_t = 120, value_parser = clap::value_parser!(u32).range(1..))]
    pub frames: u32,
    /// Fixed simulation rate in frames per second
    #[arg(long, default_value_t = 60.0, value_parser = parse_positive)]
    pub fps: f64,
    /// Output PNG for the final primary frame
    #[arg(short, long, default_value = "mirrorpass.png")]
    pub output: PathBuf,
    /// Primary frame width in pixels
    #[arg(long, default_value_t = 1280, value_parser = clap::value_parser!(u32).range(1..))]
    pub width: u32,
    /// Primary frame height in pixels
    #[arg(long, default_value_t = 720, value_parser = clap::value_parser!(u32).range(1..))]
    pub height: u32,
    /// Primary camera position as x,y,z
    #[arg(long, default_value = "0,0,4", value_parser = parse_vec3, allow_hyphen_values = true)]
    pub eye: [f32; 3],
    /// Point the primary camera looks at, as x,y,z
    #[arg(long, default_value = "-1,0,-4.5", value_parser = parse_vec3, allow_hyphen_values = true)]
    pub target: [f32; 3],
    /// Primary lens focal length in millimetres
    #[arg(long, default_value_t = 28.0, value_parser = parse_positive)]
    pub focal_length: f64,
    /// Orbit the primary camera around the target at this many degrees per second
    #[arg(long, value_parser = parse_finite, allow_hyphen_values = true)]
    pub orbit: Option<f64>,
    /// TOML file overriding the built-in mirror settings
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Also write the offscreen mirror texture to this PNG
    #[arg(long)]
    pub dump_mirror: Option<PathBuf>,
}

fn parse_vec3(s: &str) -> Result<[f32; 3], String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    let [x, y, z] = parts.as_slice() else {
        return Err(format!("expected x,y,z but got '{s}'"));
    };
    let parse = |v: &str| {
        v.parse::<f32>()
            .ok()
            .filter(|f| f.is_finite())
            .ok_or_else(|| format!("'{v}' is not a finite number"))
    };
    Ok([parse(x)?, parse(y)?, parse(z)?])
}

fn parse_finite(s: &str) -> Result<f64, String> {
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(format!("expected a finite number, got '{s}'")),
    }
}

fn parse_positive(s: &str) -> Result<f64, String> {
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() && v > 0.0 => Ok(v),
        _ => Err(format!("expected a positive number, got '{s}'")),
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    fn render_args(extra: &[&str]) -> RenderArgs {
        let argv = ["mirrorpass", "render"].iter().chain(extra).copied();
        match Cli::try_parse_from(argv).unwrap().command {
            Command::Render(args) => args,
            Command::Config { .. } => panic!("expected render"),
        }
    }

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_render_defaults() {
        let args = render_args(&[]);
        assert_eq!(args.frames, 120);
        assert_eq!(args.eye, [0.0, 0.0, 4.0]);
        assert_eq!(args.target, [-1.0, 0.0, -4.5]);
        assert_eq!(args.focal_length, 28.0);
        assert_eq!(args.output, PathBuf::from("mirrorpass.png"));
        assert!(args.dump_mirror.is_none());
        assert!(args.orbit.is_none());
    }

    #[test]
    fn test_render_camera_arguments() {
        let args = render_args(&["--eye", "1, -2, 3.5", "--focal-length", "50", "-n", "3"]);
        assert_eq!(args.eye, [1.0, -2.0, 3.5]);
        assert_eq!(args.focal_length, 50.0);
        assert_eq!(args.frames, 3);

        let args = render_args(&["--orbit", "-45"]);
        assert_eq!(args.orbit, Some(-45.0));
    }

    #[test]
    fn test_rejects_bad_values() {
        for bad in [
            &["render", "--eye", "1,2"][..],
            &["render", "--focal-length", "0"],
            &["render", "--frames", "0"],
            &["render", "--target", "a,b,c"],
            &["render", "--orbit", "inf"],
        ] {
            let argv = std::iter::once("mirrorpass").chain(bad.iter().copied());
            assert!(Cli::try_parse_from(argv).is_err(), "accepted {bad:?}");
        }
    }
}
