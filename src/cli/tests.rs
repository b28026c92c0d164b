#[cfg(test)]
mod tests {
    use std::io::Write;

    use clap::Parser;

    use crate::cli::Args;
    use crate::i18n::TargetLanguage;

    fn temp_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(content.as_bytes()).expect("write");
        file
    }

    #[test]
    fn test_args_minimal_invocation() {
        let reference = temp_file("参考资料正文，越长越好。");
        let args = Args::parse_from([
            "quill",
            "--title",
            "测试标题",
            "--reference",
            reference.path().to_str().unwrap(),
        ]);
        let config = args.into_config().expect("config");

        assert_eq!(config.generation.title, "测试标题");
        assert!(config.generation.reference_content.contains("参考资料"));
        assert!(!config.generation.turbo_mode);
        assert!(config.cache.enabled);
    }

    #[test]
    fn test_args_full_overrides() {
        let reference = temp_file("reference body");
        let outline = temp_file("Intro\nDeep Dive\nWrap Up");
        let product = temp_file("Acme Widget, the fastest widget.");

        let args = Args::parse_from([
            "quill",
            "--title",
            "Widget Guide",
            "--reference",
            reference.path().to_str().unwrap(),
            "--outline",
            outline.path().to_str().unwrap(),
            "--product",
            product.path().to_str().unwrap(),
            "--image",
            "https://example.com/a.png",
            "--image",
            "https://example.com/b.png",
            "--audience",
            "makers",
            "--authority-term",
            "ISO9001",
            "--turbo",
            "--max-parallels",
            "3",
            "-l",
            "en",
            "--output",
            "out.md",
            "--yes",
            "--no-cache",
        ]);
        let config = args.into_config().expect("config");

        assert_eq!(config.target_language, TargetLanguage::English);
        assert!(config.generation.turbo_mode);
        assert_eq!(config.generation.max_parallels, 3);
        assert_eq!(config.generation.scraped_images.len(), 2);
        assert_eq!(config.generation.authority_terms, vec!["ISO9001"]);
        assert_eq!(
            config.generation.custom_outline.as_deref(),
            Some("Intro\nDeep Dive\nWrap Up")
        );
        assert!(config.generation.product_raw_text.is_some());
        assert!(config.auto_confirm);
        assert!(!config.cache.enabled);
        assert_eq!(config.output_path, std::path::PathBuf::from("out.md"));
    }

    #[test]
    fn test_args_missing_title_rejected() {
        let reference = temp_file("body");
        let args = Args::parse_from([
            "quill",
            "--reference",
            reference.path().to_str().unwrap(),
        ]);
        assert!(args.into_config().is_err());
    }

    #[test]
    fn test_args_missing_reference_rejected() {
        let args = Args::parse_from(["quill", "--title", "t"]);
        assert!(args.into_config().is_err());
    }

    #[test]
    fn test_args_max_parallels_clamped_to_one() {
        let reference = temp_file("body");
        let args = Args::parse_from([
            "quill",
            "--title",
            "t",
            "--reference",
            reference.path().to_str().unwrap(),
            "--max-parallels",
            "0",
        ]);
        let config = args.into_config().expect("config");
        assert_eq!(config.generation.max_parallels, 1);
    }

    #[test]
    fn test_args_invalid_language_rejected() {
        let reference = temp_file("body");
        let args = Args::parse_from([
            "quill",
            "--title",
            "t",
            "--reference",
            reference.path().to_str().unwrap(),
            "-l",
            "klingon",
        ]);
        assert!(args.into_config().is_err());
    }
}
