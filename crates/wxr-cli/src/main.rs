//! WXR CLI tools: pose feeder, packet listener, runtime manifest.

#![forbid(unsafe_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use glam::{Quat, Vec2, Vec3};
use serde::Serialize;
use tracing::{info, warn};
use wxr_common::config::{DEFAULT_CONTROL_PORT, DEFAULT_POSE_PORT};
use wxr_runtime::pose::Button;
use wxr_runtime::PoseSnapshot;

#[derive(Parser, Debug)]
#[command(name = "wxr")]
#[command(about = "WXR emulated headset tools")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Stream synthetic tracking packets to a running runtime
    Feed {
        /// Runtime pose address (host:port)
        #[arg(short, long, default_value_t = SocketAddr::from(([127, 0, 0, 1], DEFAULT_POSE_PORT)))]
        target: SocketAddr,

        /// Packets per second
        #[arg(short, long, default_value_t = 90.0)]
        rate: f64,

        /// Stop after this many packets
        #[arg(short, long)]
        count: Option<u64>,

        /// Client tag written at the start of each record
        #[arg(long, default_value = "wxr-feed")]
        client: String,
    },

    /// Print tracking packets or control messages received on a UDP port
    Listen {
        /// Port to bind on 127.0.0.1
        #[arg(short, long, default_value_t = DEFAULT_POSE_PORT)]
        port: u16,

        /// Print control messages from the runtime instead of parsing pose records
        #[arg(long)]
        control: bool,
    },

    /// Write the OpenXR runtime manifest
    Manifest {
        /// Path of the runtime library the loader should open
        #[arg(short, long)]
        library: Option<PathBuf>,

        /// Output file; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show version information
    Version,
}

#[derive(Serialize, Debug)]
struct RuntimeManifest {
    file_format_version: &'static str,
    runtime: ManifestRuntime,
}

#[derive(Serialize, Debug)]
struct ManifestRuntime {
    name: &'static str,
    library_path: String,
}

fn manifest(library: &Path) -> RuntimeManifest {
    RuntimeManifest {
        file_format_version: "1.0.0",
        runtime: ManifestRuntime {
            name: wxr_runtime::system::RUNTIME_NAME,
            library_path: library.display().to_string(),
        },
    }
}

/// Library file name of the runtime next to the running binary.
fn default_library() -> Result<PathBuf> {
    let exe = std::env::current_exe().context("locating the wxr binary")?;
    let dir = exe.parent().context("wxr binary has no parent directory")?;
    let file = format!(
        "{}wxr_openxr{}",
        std::env::consts::DLL_PREFIX,
        std::env::consts::DLL_SUFFIX
    );
    Ok(dir.join(file))
}

/// A slow head sway with both hands held in front, pulling the right trigger once a second.
fn synthetic_pose(client: &str, frame: u64, rate: f64) -> PoseSnapshot {
    let t = frame as f32 / rate as f32;
    let mut pose = PoseSnapshot::identity();
    pose.client = client.to_string();
    pose.frame_id = frame as i64;
    pose.head_orientation = Quat::from_rotation_y(0.3 * (t * 0.5).sin());
    pose.head_position = Vec3::new(0.0, 1.7, 0.0);
    pose.left.position = Vec3::new(-0.2, 1.3, -0.4);
    pose.right.position = Vec3::new(0.2, 1.3 + 0.05 * t.sin(), -0.4);
    pose.left.thumbstick = Vec2::new(t.cos(), t.sin()) * 0.5;
    pose.set_pressed(Button::RTrigger, (frame as f64 % rate) < rate / 2.0);
    pose
}

async fn feed(target: SocketAddr, rate: f64, count: Option<u64>, client: &str) -> Result<()> {
    anyhow::ensure!(rate.is_finite() && rate > 0.0, "rate must be positive");
    let socket = tokio::net::UdpSocket::bind("127.0.0.1:0").await?;
    socket.connect(target).await?;
    info!(%target, rate, "feeding tracking packets");

    let mut ticker = tokio::time::interval(Duration::from_secs_f64(1.0 / rate));
    let mut frame = 0u64;
    loop {
        if count.is_some_and(|limit| frame >= limit) {
            break;
        }
        ticker.tick().await;
        let record = synthetic_pose(client, frame, rate).to_record();
        if let Err(e) = socket.send(record.as_bytes()).await {
            warn!(error = %e, "send failed");
        }
        frame += 1;
    }
    println!("Sent {} packets to {}", frame, target);
    Ok(())
}

async fn listen(port: u16, control: bool) -> Result<()> {
    let socket = tokio::net::UdpSocket::bind(("127.0.0.1", port))
        .await
        .with_context(|| format!("binding 127.0.0.1:{port}"))?;
    println!("Listening on {}", socket.local_addr()?);

    let mut buf = vec![0u8; 2048];
    loop {
        let (len, from) = socket.recv_from(&mut buf).await?;
        let text = String::from_utf8_lossy(&buf[..len]);
        if control {
            println!("{} control: {}", from, text.trim());
            continue;
        }
        match PoseSnapshot::parse(&text) {
            Ok(pose) => println!(
                "{} {} frame={} head=({:.3}, {:.3}, {:.3}) left=({:.3}, {:.3}, {:.3}) right=({:.3}, {:.3}, {:.3})",
                from,
                pose.client,
                pose.frame_id,
                pose.head_position.x,
                pose.head_position.y,
                pose.head_position.z,
                pose.left.position.x,
                pose.left.position.y,
                pose.left.position.z,
                pose.right.position.x,
                pose.right.position.y,
                pose.right.position.z,
            ),
            Err(e) => warn!(%from, error = %e, "malformed record"),
        }
    }
}

fn main() -> Result<()> {
    wxr_common::init_tracing();

    let args = Args::parse();

    match args.command {
        Command::Feed {
            target,
            rate,
            count,
            client,
        } => {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            rt.block_on(feed(target, rate, count, &client))?;
        }
        Command::Listen { port, control } => {
            let port = if control && port == DEFAULT_POSE_PORT {
                DEFAULT_CONTROL_PORT
            } else {
                port
            };
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            rt.block_on(async {
                tokio::select! {
                    result = listen(port, control) => result,
                    _ = tokio::signal::ctrl_c() => Ok(()),
                }
            })?;
        }
        Command::Manifest { library, output } => {
            let library = match library {
                Some(path) => path,
                None => default_library()?,
            };
            let json = serde_json::to_string_pretty(&manifest(&library))?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json + "\n")
                        .with_context(|| format!("writing {}", path.display()))?;
                    println!("Manifest: {}", path.display());
                }
                None => println!("{}", json),
            }
        }
        Command::Version => {
            println!("wxr {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_shape() {
        let json = serde_json::to_value(manifest(Path::new("/opt/wxr/libwxr_openxr.so")))
            .expect("manifest serializes");
        assert_eq!(json["file_format_version"], "1.0.0");
        assert_eq!(json["runtime"]["name"], "OpenXR WXR Runtime");
        assert_eq!(json["runtime"]["library_path"], "/opt/wxr/libwxr_openxr.so");
    }

    #[test]
    fn test_synthetic_pose_is_a_valid_record() {
        let pose = synthetic_pose("feeder", 10, 90.0);
        let parsed = PoseSnapshot::parse(&pose.to_record()).expect("record parses");
        assert_eq!(parsed.client, "feeder");
        assert_eq!(parsed.frame_id, 10);
        assert!(parsed.pressed(Button::RTrigger));
        assert!((parsed.head_position.y - 1.7).abs() < 1e-5);
    }

    #[test]
    fn test_trigger_released_in_second_half() {
        let pose = synthetic_pose("feeder", 60, 90.0);
        assert!(!pose.pressed(Button::RTrigger));
    }
}
