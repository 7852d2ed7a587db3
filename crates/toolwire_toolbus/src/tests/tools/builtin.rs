use crate::tools::{builtin_tool, builtin_tool_names};

#[test]
fn test_builtin_names_resolve() {
    for name in builtin_tool_names() {
        let tool = builtin_tool(name).unwrap();
        assert_eq!(tool.name(), *name);
        assert!(!tool.description().is_empty());
        assert_eq!(tool.parameters_schema()["type"], "object");
    }
}

#[test]
fn test_unknown_builtin() {
    assert!(builtin_tool("rm_rf").is_none());
}
