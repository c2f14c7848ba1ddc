//! Reserved keywords and words the host environment is expected to know.
//! A use of one of these never registers as an unknown variable.

use phf::phf_set;

static KNOWN_WORDS_LOWER: phf::Set<&'static str> = phf_set! {
    // language keywords and predefined objects
    "abstract", "arguments", "await", "boolean", "break", "byte", "case",
    "catch", "char", "class", "const", "continue", "debugger", "default",
    "delete", "do", "double", "else", "enum", "eval", "export", "extends",
    "false", "final", "finally", "float", "for", "function", "goto", "if",
    "implements", "import", "in", "instanceof", "int", "interface", "let",
    "long", "native", "new", "null", "package", "private", "protected",
    "public", "return", "short", "static", "super", "switch", "synchronized",
    "this", "throw", "throws", "transient", "true", "try", "typeof", "var",
    "void", "volatile", "while", "with", "yield", "array", "date",
    "hasownproperty", "infinity", "isfinite", "isnan", "isprototypeof",
    "length", "math", "nan", "name", "number", "object", "prototype",
    "string", "tostring", "undefined", "valueof", "getclass", "java",
    "javaarray", "javaclass", "javaobject", "javapackage", "alert", "all",
    "anchor", "anchors", "area", "assign", "blur", "button", "checkbox",
    "clearinterval", "cleartimeout", "clientinformation", "close", "closed",
    "confirm", "constructor", "crypto", "decodeuri", "decodeuricomponent",
    "defaultstatus", "document", "element", "elements", "embed", "embeds",
    "encodeuri", "encodeuricomponent", "escape", "event", "fileupload",
    "focus", "form", "forms", "frame", "innerheight", "innerwidth", "layer",
    "layers", "link", "location", "mimetypes", "navigate", "navigator",
    "frames", "framerate", "hidden", "history", "image", "images",
    "offscreenbuffering", "open", "opener", "option", "outerheight",
    "outerwidth", "packages", "pagexoffset", "pageyoffset", "parent",
    "parsefloat", "parseint", "password", "pkcs11", "plugin", "prompt",
    "propertyisenum", "radio", "reset", "screenx", "screeny", "scroll",
    "secure", "select", "self", "setinterval", "settimeout", "status",
    "submit", "taint", "text", "textarea", "top", "unescape", "untaint",
    "window", "onblur", "onclick", "onerror", "onfocus", "onkeydown",
    "onkeypress", "onkeyup", "onmouseover", "onload", "onmouseup",
    "onmousedown", "onsubmit", "define", "exports", "require", "each",
    "activexobject", "console", "module", "error", "typeerror", "rangeerror",
    "regexp", "symbol", "set",
    // host and extension APIs
    "addeventlistener", "browser", "chrome", "localstorage", "postmessage",
    "promise", "json", "xmlhttprequest", "$", "screen", "cryptojs",
};

/// Case-insensitive membership test.
pub fn is_known_word(name: &str) -> bool {
    KNOWN_WORDS_LOWER.contains(name.to_lowercase().as_str())
}

#[test]
fn keywords_and_host_apis_are_known() {
    assert!(is_known_word("window"));
    assert!(is_known_word("JSON"));
    assert!(is_known_word("XMLHttpRequest"));
    assert!(is_known_word("setTimeout"));
}

#[test]
fn app_identifiers_are_not_known() {
    assert!(!is_known_word("wx"));
    assert!(!is_known_word("userData"));
    assert!(!is_known_word("Page"));
}
