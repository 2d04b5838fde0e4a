use tkgraph::parser::treesitter::all_parsers;

pub fn list_languages() {
    println!("Supported languages:");
    for parser in all_parsers() {
        println!("  {:<12} .{}", parser.language(), parser.extensions().join(", ."));
    }
}
