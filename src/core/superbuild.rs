//! CMake rendering of the superbuild
//!
//! Each [`BuildNode`] becomes one `ExternalProject_Add` call. Configuration,
//! test and build steps run through the package's command shims so that
//! every tool sees the package's build environment.

use crate::core::build_system::GeneratorKind;
use crate::core::plan::{BuildDescription, BuildNode};

/// Separator CMake uses for list arguments inside a node
pub const LIST_SEPARATOR: char = '|';

/// Quote a CMake argument, encoding list separators
fn quote_arg(arg: &str) -> String {
    let escaped = arg
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace(';', &LIST_SEPARATOR.to_string());
    format!("\"{escaped}\"")
}

fn quote_path(path: &std::path::Path) -> String {
    format!("\"{}\"", path.display())
}

/// Render the complete `CMakeLists.txt`
pub fn render_cmakelists(description: &BuildDescription) -> String {
    let mut out = format!(
        "cmake_minimum_required(VERSION ${{CMAKE_VERSION}})
project({project} NONE)
set(SPACKDEV_PREFIX {prefix})
set(SPACKDEV_SOURCE_DIR {source})
set(SPACKDEV_TMPDIR {tmp})

include(ExternalProject)

set_property(DIRECTORY PROPERTY EP_STEP_TARGETS
             configure build install test
  )
",
        project = description.project,
        prefix = quote_path(&description.prefix),
        source = quote_path(&description.source_dir),
        tmp = quote_path(&description.tmp_dir),
    );
    for node in &description.nodes {
        render_node(&mut out, description, node);
    }
    out
}

fn render_node(out: &mut String, description: &BuildDescription, node: &BuildNode) {
    let package = &node.package;
    let wrapper = |tool: &str| quote_path(&description.wrapper(package, tool));
    let build_command = match node.tool.kind {
        GeneratorKind::Ninja => wrapper(GeneratorKind::Ninja.label()),
        GeneratorKind::Make => format!(
            "\"env\" \"MAKE={}\" \"$(MAKE)\"",
            description.wrapper(package, "make").display()
        ),
    };
    let cmake_args = node
        .args
        .iter()
        .map(|arg| quote_arg(arg))
        .collect::<Vec<_>>()
        .join(" ");

    out.push_str(&format!(
        "
# {package}
file(MAKE_DIRECTORY ${{SPACKDEV_TMPDIR}}/{package})
file(MAKE_DIRECTORY {package})

ExternalProject_Add({package}
  TEST_BEFORE_INSTALL ON
  TMP_DIR \"${{SPACKDEV_TMPDIR}}/{package}\"
  STAMP_DIR \"${{SPACKDEV_TMPDIR}}/{package}/stamp\"
  DOWNLOAD_DIR \"${{SPACKDEV_TMPDIR}}/{package}\"
  SOURCE_DIR \"${{SPACKDEV_SOURCE_DIR}}/{package}\"
  BINARY_DIR \"{package}\"
  INSTALL_DIR \"${{SPACKDEV_PREFIX}}/{package}\"
  CMAKE_COMMAND {cmake}
  TEST_COMMAND {ctest}
  CMAKE_GENERATOR \"{generator}\"
  CMAKE_ARGS {cmake_args}
  BUILD_COMMAND {build_command}
  BUILD_ALWAYS TRUE
  LIST_SEPARATOR \"{separator}\"
  DEPENDS {depends}
  )
",
        cmake = wrapper("cmake"),
        ctest = wrapper("ctest"),
        generator = node.tool.generator,
        separator = LIST_SEPARATOR,
        depends = node.dependencies.join(" "),
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::build_system::ToolSelection;
    use std::path::PathBuf;

    fn description(nodes: Vec<BuildNode>) -> BuildDescription {
        BuildDescription {
            project: "spackdev".to_string(),
            prefix: PathBuf::from("/area/install"),
            source_dir: PathBuf::from("/area/srcs"),
            tmp_dir: PathBuf::from("/area/tmp"),
            wrappers_dir: PathBuf::from("/area/spackdev-aux/packages"),
            nodes,
        }
    }

    fn node(package: &str, args: &[&str], deps: &[&str], kind: GeneratorKind) -> BuildNode {
        BuildNode {
            package: package.to_string(),
            args: args.iter().map(ToString::to_string).collect(),
            dependencies: deps.iter().map(ToString::to_string).collect(),
            tool: ToolSelection {
                generator: match kind {
                    GeneratorKind::Make => "Unix Makefiles".to_string(),
                    GeneratorKind::Ninja => "Ninja".to_string(),
                },
                kind,
            },
        }
    }

    #[test]
    fn test_preamble() {
        let text = render_cmakelists(&description(Vec::new()));
        assert!(text.starts_with(
            "cmake_minimum_required(VERSION ${CMAKE_VERSION})\nproject(spackdev NONE)\n"
        ));
        assert!(text.contains("set(SPACKDEV_PREFIX \"/area/install\")"));
        assert!(text.contains("set(SPACKDEV_SOURCE_DIR \"/area/srcs\")"));
        assert!(text.contains("include(ExternalProject)"));
    }

    #[test]
    fn test_make_node() {
        let text = render_cmakelists(&description(vec![
            node("cetlib", &[], &[], GeneratorKind::Make),
            node("art", &["-DA=x;y", "-DQ=\"q\""], &["cetlib"], GeneratorKind::Make),
        ]));
        assert!(text.contains("ExternalProject_Add(art\n"));
        assert!(text.contains("  CMAKE_COMMAND \"/area/spackdev-aux/packages/art/bin/cmake\"\n"));
        assert!(text.contains("  TEST_COMMAND \"/area/spackdev-aux/packages/art/bin/ctest\"\n"));
        assert!(text.contains("  CMAKE_ARGS \"-DA=x|y\" \"-DQ=\\\"q\\\"\"\n"));
        assert!(text.contains(
            "  BUILD_COMMAND \"env\" \"MAKE=/area/spackdev-aux/packages/art/bin/make\" \"$(MAKE)\"\n"
        ));
        assert!(text.contains("  DEPENDS cetlib\n"));
        assert!(text.contains("  LIST_SEPARATOR \"|\"\n"));
        let cetlib = text.find("ExternalProject_Add(cetlib").unwrap();
        assert!(cetlib < text.find("ExternalProject_Add(art").unwrap());
    }

    #[test]
    fn test_ninja_node() {
        let text =
            render_cmakelists(&description(vec![node("art", &[], &[], GeneratorKind::Ninja)]));
        assert!(text.contains("  CMAKE_GENERATOR \"Ninja\"\n"));
        assert!(text.contains("  BUILD_COMMAND \"/area/spackdev-aux/packages/art/bin/ninja\"\n"));
        assert!(text.contains("  DEPENDS \n"));
    }
}
