// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Seed end-to-end scenarios: a real TCP client talks to a real
//! `rigmuxd` control plane, which in turn talks to small scripted fake
//! `rigctld` servers standing in for physical transceivers.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rigmux_core::{BackendKind, Config, RigConfig};
use rigmux_server::ControlPlane;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

/// A minimal scripted rigctld: tracks one frequency/mode pair and answers
/// `get_freq`/`set_freq`/`get_mode`/`set_mode` in ERP form, the form every
/// real hamlib `rigctld -v` build understands.
async fn spawn_fake_rigctld() -> (u16, Arc<AtomicI64>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let freq = Arc::new(AtomicI64::new(0));
    let freq_for_task = freq.clone();

    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else { return };
            let freq = freq_for_task.clone();
            tokio::spawn(async move {
                let (read_half, mut write_half) = stream.into_split();
                let mut lines = BufReader::new(read_half).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    let body = line.strip_prefix('+').unwrap_or(&line);
                    let body = body.strip_prefix('\\').unwrap_or(body);
                    let mut tokens = body.split_whitespace();
                    let name = tokens.next().unwrap_or("");
                    let reply = match name {
                        "get_freq" => format!("Frequency: {}\nRPRT 0\n", freq.load(Ordering::SeqCst)),
                        "set_freq" => {
                            if let Some(hz) = tokens.next().and_then(|s| s.parse::<i64>().ok()) {
                                freq.store(hz, Ordering::SeqCst);
                            }
                            "RPRT 0\n".to_string()
                        }
                        "get_mode" => "Mode: USB\nPassband: 2400\nRPRT 0\n".to_string(),
                        "set_mode" => "RPRT 0\n".to_string(),
                        _ => "RPRT 0\n".to_string(),
                    };
                    if write_half.write_all(reply.as_bytes()).await.is_err() {
                        break;
                    }
                }
            });
        }
    });

    (port, freq)
}

fn rig_config(name: &str, port: u16, follow_main: bool, enabled: bool) -> RigConfig {
    RigConfig {
        name: name.to_string(),
        enabled,
        poll_interval_ms: 1000,
        backend: BackendKind::Tcp,
        host: "127.0.0.1".to_string(),
        port,
        model_id: None,
        device: None,
        baud: None,
        serial_opts: vec![],
        extra_args: vec![],
        follow_main,
        allow_out_of_band: true,
        band_presets: vec![],
        color: None,
        inverted: false,
    }
}

async fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

async fn send_and_read(port: u16, line: &str) -> String {
    let stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
    let (read_half, mut write_half) = stream.into_split();
    write_half.write_all(line.as_bytes()).await.unwrap();
    write_half.write_all(b"\n").await.unwrap();
    let mut reader = BufReader::new(read_half);
    let mut response = String::new();
    // Every response here is a single line terminated with '\n'.
    reader.read_line(&mut response).await.unwrap();
    response
}

#[tokio::test]
async fn fan_out_mirrors_frequency_to_following_rig() {
    let (source_port, _source_freq) = spawn_fake_rigctld().await;
    let (follower_port, follower_freq) = spawn_fake_rigctld().await;
    let listen_port = free_port().await;

    let plane = ControlPlane::new();
    plane
        .apply(Config {
            rigs: vec![rig_config("source", source_port, true, true), rig_config("follower", follower_port, true, true)],
            sync_enabled: true,
            sync_source_index: 0,
            poll_interval_ms: 60_000,
            rigctl_listen_host: "127.0.0.1".to_string(),
            rigctl_listen_port: listen_port,
        })
        .await
        .unwrap();
    plane.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let response = send_and_read(listen_port, "F 14074000").await;
    assert_eq!(response, "RPRT 0\n");

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(follower_freq.load(Ordering::SeqCst), 14074000);

    plane.stop().await;
}

#[tokio::test]
async fn follow_main_false_suppresses_mirroring() {
    let (source_port, _source_freq) = spawn_fake_rigctld().await;
    let (follower_port, follower_freq) = spawn_fake_rigctld().await;
    let listen_port = free_port().await;

    let plane = ControlPlane::new();
    plane
        .apply(Config {
            rigs: vec![rig_config("source", source_port, true, true), rig_config("follower", follower_port, false, true)],
            sync_enabled: true,
            sync_source_index: 0,
            poll_interval_ms: 60_000,
            rigctl_listen_host: "127.0.0.1".to_string(),
            rigctl_listen_port: listen_port,
        })
        .await
        .unwrap();
    plane.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    send_and_read(listen_port, "F 14074000").await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(follower_freq.load(Ordering::SeqCst), 0);

    plane.stop().await;
}

#[tokio::test]
async fn sync_disabled_suppresses_mirroring_even_with_follow_main() {
    let (source_port, _source_freq) = spawn_fake_rigctld().await;
    let (follower_port, follower_freq) = spawn_fake_rigctld().await;
    let listen_port = free_port().await;

    let plane = ControlPlane::new();
    plane
        .apply(Config {
            rigs: vec![rig_config("source", source_port, true, true), rig_config("follower", follower_port, true, true)],
            sync_enabled: false,
            sync_source_index: 0,
            poll_interval_ms: 60_000,
            rigctl_listen_host: "127.0.0.1".to_string(),
            rigctl_listen_port: listen_port,
        })
        .await
        .unwrap();
    plane.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    send_and_read(listen_port, "F 14074000").await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(follower_freq.load(Ordering::SeqCst), 0);

    plane.stop().await;
}

#[tokio::test]
async fn extended_response_get_freq_matches_exact_bytes() {
    let (source_port, source_freq) = spawn_fake_rigctld().await;
    source_freq.store(14074000, Ordering::SeqCst);
    let listen_port = free_port().await;

    let plane = ControlPlane::new();
    plane
        .apply(Config {
            rigs: vec![rig_config("source", source_port, true, true)],
            sync_enabled: false,
            sync_source_index: 0,
            poll_interval_ms: 60_000,
            rigctl_listen_host: "127.0.0.1".to_string(),
            rigctl_listen_port: listen_port,
        })
        .await
        .unwrap();
    plane.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let stream = TcpStream::connect(("127.0.0.1", listen_port)).await.unwrap();
    let (read_half, mut write_half) = stream.into_split();
    write_half.write_all(b"+f\n").await.unwrap();
    let mut reader = BufReader::new(read_half);
    let mut response = String::new();
    for _ in 0..3 {
        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        response.push_str(&line);
    }
    assert_eq!(response, "get_freq:\nFrequency: 14074000\nRPRT 0\n");

    plane.stop().await;
}

#[tokio::test]
async fn out_of_band_frequency_is_rejected_with_recorded_last_error() {
    let (source_port, _source_freq) = spawn_fake_rigctld().await;
    let listen_port = free_port().await;

    let mut source = rig_config("source", source_port, true, true);
    source.allow_out_of_band = false;
    source.band_presets = vec![rigmux_core::BandPreset {
        label: "20m".to_string(),
        center_hz: 14_150_000,
        enabled: true,
        lower_hz: Some(14_000_000),
        upper_hz: Some(14_350_000),
    }];

    let plane = ControlPlane::new();
    plane
        .apply(Config {
            rigs: vec![source],
            sync_enabled: false,
            sync_source_index: 0,
            poll_interval_ms: 60_000,
            rigctl_listen_host: "127.0.0.1".to_string(),
            rigctl_listen_port: listen_port,
        })
        .await
        .unwrap();
    plane.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let response = send_and_read(listen_port, "F 7074000").await;
    assert_eq!(response, "RPRT -1\n");

    let rigs = plane.rig_clients().current().await;
    assert_eq!(rigs[0].last_error().await.unwrap(), "Frequency out of configured band ranges");

    plane.stop().await;
}
