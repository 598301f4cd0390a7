mod common;
mod utils;

use anyhow::Result;
use common::TestEnvironment;
use std::fs;

const TRANSCRIPT: &str = r#"{
  "text": " Hello brave new world. Bye.",
  "segments": [
    {
      "start": 0.0,
      "end": 2.0,
      "words": [
        {"word": " Hello", "start": 0.0, "end": 0.4},
        {"word": " brave", "start": 0.5, "end": 0.9},
        {"word": " new", "start": 1.0, "end": 1.2},
        {"word": " world.", "start": 1.3, "end": 1.8}
      ]
    },
    {
      "start": 3.0,
      "end": 3.5,
      "words": [
        {"word": " Bye.", "start": 3.0, "end": 3.0}
      ]
    }
  ]
}"#;

#[test]
fn test_generate_phrase_subtitles_from_transcript() -> Result<()> {
    let env = TestEnvironment::new()?;
    let media = env.media("talk.mp4")?;
    let transcript = env.transcript("talk.json", TRANSCRIPT)?;

    let output = utils::run_easysub_command(
        &env,
        &[
            "generate",
            media.to_str().unwrap(),
            "--transcript",
            transcript.to_str().unwrap(),
            "--max-words",
            "3",
        ],
    )?;
    assert_eq!(output.exit_code, 0, "generate failed: {}", output.stderr);

    let srt = utils::read_file(&env.path().join("talk.srt"))?;
    assert_eq!(
        srt,
        "1\n00:00:00,000 --> 00:00:01,200\nHello brave new\n\n\
         2\n00:00:01,300 --> 00:00:01,800\nworld.\n\n\
         3\n00:00:03,000 --> 00:00:03,500\nBye.\n\n"
    );

    // First run writes the default config
    assert!(env.config_file().exists());
    Ok(())
}

#[test]
fn test_generate_word_mode_to_custom_path() -> Result<()> {
    let env = TestEnvironment::new()?;
    let media = env.media("talk.mp4")?;
    let transcript = env.transcript("talk.json", TRANSCRIPT)?;
    let srt_path = env.path().join("custom.srt");

    let output = utils::run_easysub_command(
        &env,
        &[
            "generate",
            media.to_str().unwrap(),
            "--transcript",
            transcript.to_str().unwrap(),
            "--mode",
            "word",
            "--srt-out",
            srt_path.to_str().unwrap(),
        ],
    )?;
    assert_eq!(output.exit_code, 0, "generate failed: {}", output.stderr);

    let srt = utils::read_file(&srt_path)?;
    assert!(srt.starts_with("1\n00:00:00,000 --> 00:00:00,400\nHello\n\n"));
    assert!(srt.ends_with("5\n00:00:03,000 --> 00:00:03,100\nBye.\n\n"));
    assert!(!env.path().join("talk.srt").exists());
    Ok(())
}

#[test]
fn test_generate_empty_transcript_writes_empty_file() -> Result<()> {
    let env = TestEnvironment::new()?;
    let media = env.media("silence.mp4")?;
    let transcript = env.transcript("silence.json", r#"{"text": "", "segments": []}"#)?;

    // Rendering is skipped entirely, so no renderer is needed here
    let output = utils::run_easysub_command(
        &env,
        &[
            "generate",
            media.to_str().unwrap(),
            "--transcript",
            transcript.to_str().unwrap(),
            "--render",
        ],
    )?;
    assert_eq!(output.exit_code, 0, "generate failed: {}", output.stderr);

    assert_eq!(fs::read(env.path().join("silence.srt"))?, b"");
    assert!(!env.path().join("silence_subbed.mp4").exists());
    Ok(())
}

#[test]
fn test_generate_refuses_to_overwrite_without_force() -> Result<()> {
    let env = TestEnvironment::new()?;
    let media = env.media("talk.mp4")?;
    let transcript = env.transcript("talk.json", TRANSCRIPT)?;
    let existing = env.path().join("talk.srt");
    fs::write(&existing, "keep me")?;

    let args = [
        "generate",
        media.to_str().unwrap(),
        "--transcript",
        transcript.to_str().unwrap(),
    ];

    let output = utils::run_easysub_command(&env, &args)?;
    assert_eq!(output.exit_code, 1);
    assert!(output.stderr.contains("already exists"), "{}", output.stderr);
    assert_eq!(utils::read_file(&existing)?, "keep me");

    let mut forced = args.to_vec();
    forced.push("--force");
    let output = utils::run_easysub_command(&env, &forced)?;
    assert_eq!(output.exit_code, 0, "generate failed: {}", output.stderr);
    assert!(utils::read_file(&existing)?.starts_with("1\n"));
    Ok(())
}

#[test]
fn test_generate_missing_media_fails() -> Result<()> {
    let env = TestEnvironment::new()?;
    let output = utils::run_easysub_command(&env, &["generate", "nowhere.mp4"])?;

    assert_eq!(output.exit_code, 1);
    assert!(output.stderr.contains("does not exist"), "{}", output.stderr);
    Ok(())
}

#[test]
fn test_malformed_transcript_reports_failure() -> Result<()> {
    let env = TestEnvironment::new()?;
    let media = env.media("talk.mp4")?;
    let transcript = env.transcript("talk.json", "{broken")?;

    let output = utils::run_easysub_command(
        &env,
        &[
            "--output",
            "json",
            "generate",
            media.to_str().unwrap(),
            "--transcript",
            transcript.to_str().unwrap(),
        ],
    )?;

    assert_eq!(output.exit_code, 1);
    let failure = output
        .stderr
        .lines()
        .filter_map(|line| serde_json::from_str::<serde_json::Value>(line).ok())
        .find(|event| event["code"] == "subtitle.generate.failed")
        .expect("failure event");
    assert_eq!(failure["level"], "error");
    assert!(
        failure["message"]
            .as_str()
            .unwrap()
            .contains("invalid transcript JSON")
    );
    Ok(())
}

#[test]
fn test_config_show_uses_configured_values() -> Result<()> {
    let env = TestEnvironment::new()?;
    fs::create_dir_all(env.config_file().parent().unwrap())?;
    fs::write(env.config_file(), "model = \"medium\"\nmax_words = 2\n")?;

    let output = utils::run_easysub_command(&env, &["config", "show"])?;
    assert_eq!(output.exit_code, 0, "config show failed: {}", output.stderr);
    assert!(output.stdout.contains("model = \"medium\""));
    assert!(output.stdout.contains("max_words = 2"));

    let output = utils::run_easysub_command(&env, &["config", "path"])?;
    assert_eq!(output.stdout.trim(), env.config_file().display().to_string());
    Ok(())
}

#[test]
fn test_configured_max_words_applies_to_generate() -> Result<()> {
    let env = TestEnvironment::new()?;
    fs::create_dir_all(env.config_file().parent().unwrap())?;
    fs::write(env.config_file(), "max_words = 2\n")?;
    let media = env.media("talk.mp4")?;
    let transcript = env.transcript("talk.json", TRANSCRIPT)?;

    let output = utils::run_easysub_command(
        &env,
        &[
            "generate",
            media.to_str().unwrap(),
            "--transcript",
            transcript.to_str().unwrap(),
        ],
    )?;
    assert_eq!(output.exit_code, 0, "generate failed: {}", output.stderr);

    let srt = utils::read_file(&env.path().join("talk.srt"))?;
    assert!(srt.starts_with("1\n00:00:00,000 --> 00:00:00,900\nHello brave\n\n"));
    assert!(srt.contains("2\n00:00:01,000 --> 00:00:01,800\nnew world.\n\n"));
    Ok(())
}

#[test]
fn test_relative_outputs_never_overwrite_the_source() -> Result<()> {
    let env = TestEnvironment::new()?;
    let media = env.media("talk.mp4")?;
    let transcript = env.transcript("talk.json", TRANSCRIPT)?;

    // Runs from the media's directory, so these name the source itself
    let output = utils::run_easysub_command(
        &env,
        &[
            "generate",
            "talk.mp4",
            "--transcript",
            transcript.to_str().unwrap(),
            "--render",
            "--video-out",
            "talk.mp4",
        ],
    )?;
    assert_eq!(output.exit_code, 1);
    assert!(output.stderr.contains("would overwrite the source"), "{}", output.stderr);

    let output = utils::run_easysub_command(
        &env,
        &[
            "generate",
            "talk.mp4",
            "--transcript",
            transcript.to_str().unwrap(),
            "--srt-out",
            "./talk.mp4",
            "--force",
        ],
    )?;
    assert_eq!(output.exit_code, 1);
    assert!(output.stderr.contains("would overwrite the source"), "{}", output.stderr);

    assert_eq!(utils::read_file(&media)?, "not really a video");
    assert!(!env.path().join("talk.srt").exists());
    Ok(())
}
