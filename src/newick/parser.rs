use crate::model::tree::{Tree, VertexIndex};
use crate::model::vertex::BranchLength;
use crate::newick::defs::{DEFAULT_NUM_LEAVES_GUESS, NEWICK_LABEL_DELIMITERS};
use crate::parser::byte_parser::ByteParser;
use crate::parser::parsing_error::ParsingError;

/// Parser (configuration) for Newick strings of n-ary phylogenetic [Tree]s.
///
/// Leaves and internal vertices may carry labels; all vertices may carry a
/// branch length. Labels are kept verbatim in the vertices.
///
/// # Configuration
/// * `with_num_leaves(num_leaves)` - Can be configured with number of leaves in the tree,
///    otherwise it is counted while parsing and reused for the next tree.
///
/// # Format
/// * tree ::= internal_vertex ';'
/// * vertex ::= leaf | internal_vertex
/// * internal_vertex ::= '(' vertex { ',' vertex } ')' [label] [branch_length]
/// * leaf ::= label [branch_length]
/// * branch_length ::= ':' number
///
/// Furthermore:
/// * Whitespace and `[...]` comments can occur between elements,
///   just not within an unquoted label or a branch_length
/// * Labels in single quotes may contain delimiters; `''` is an escaped quote
/// * Extended Newick annotations (`[&...]`) are treated as comments
///
/// # Example
/// ```
/// use phylocurate::newick::NewickParser;
/// use phylocurate::parser::ByteParser;
///
/// let mut byte_parser = ByteParser::for_str("((A:1,B:1)N1:0.5,C:2)ROOT;");
/// let tree = NewickParser::new().parse(&mut byte_parser).unwrap();
///
/// assert_eq!(tree.num_leaves(), 3);
/// assert!(tree.find_vertex("N1").is_some());
/// ```
pub struct NewickParser {
    know_num_leaves: bool,
    num_leaves: usize,
}

impl Default for NewickParser {
    fn default() -> Self {
        Self::new()
    }
}

impl NewickParser {
    /// Creates a new `NewickParser` with an unknown number of leaves.
    pub fn new() -> Self {
        Self {
            know_num_leaves: false,
            num_leaves: DEFAULT_NUM_LEAVES_GUESS,
        }
    }

    /// Sets the expected number of leaves in the tree.
    ///
    /// This allows pre-allocation of the vertex arena.
    pub fn with_num_leaves(mut self, num_leaves: usize) -> Self {
        self.num_leaves = num_leaves;
        self.know_num_leaves = true;
        self
    }

    /// Parses a single Newick tree from the given [ByteParser].
    ///
    /// # Arguments
    /// * `parser` - The byte parser positioned at the start of a Newick tree string
    ///
    /// # Returns
    /// * `Ok(Tree)` - The parsed phylogenetic tree
    /// * `Err(ParsingError)` - If the Newick format is invalid
    pub fn parse(&mut self, parser: &mut ByteParser) -> Result<Tree, ParsingError> {
        // A binary tree has 2n - 1 vertices
        let mut tree = Tree::with_capacity(2 * self.num_leaves);

        // Reset number of leaves to 0, so we can now track it and determine the actual count
        if !self.know_num_leaves {
            self.num_leaves = 0;
        }

        self.parse_root(parser, &mut tree)?;

        self.know_num_leaves = true;
        Ok(tree)
    }

    /// Parses root of tree and sets it as root:
    /// - `(children)[label][:branch_length];`
    /// - Skips leading comments and whitespace
    ///
    /// Equivalent to `parse_internal_vertex` but expects the terminating semicolon
    fn parse_root(&mut self, parser: &mut ByteParser, tree: &mut Tree) -> Result<(), ParsingError> {
        parser.skip_comment_and_whitespace()?;
        if parser.is_eof() {
            return Err(ParsingError::unexpected_eof(parser));
        }

        let root = self.parse_internal_vertex(parser, tree)?;

        // Consume the terminating semicolon
        parser.skip_comment_and_whitespace()?;
        if !parser.consume_if(b';') {
            return Err(ParsingError::invalid_newick_string(
                parser,
                format!("Expected ';' at end of tree but found {:?}", parser.peek().map(|b| b as char)),
            ));
        }

        tree.set_root(root);
        Ok(())
    }

    /// Parses a vertex (either internal vertex or leaf) and returns its index:
    /// - Skips leading comments and whitespace
    /// - Dispatches to `parse_internal_vertex` if starts with `(`, otherwise `parse_leaf`
    fn parse_vertex(&mut self, parser: &mut ByteParser, tree: &mut Tree) -> Result<VertexIndex, ParsingError> {
        parser.skip_comment_and_whitespace()?;
        if parser.peek_is(b'(') {
            self.parse_internal_vertex(parser, tree)
        } else {
            self.parse_leaf(parser, tree)
        }
    }

    /// Parses internal vertex, adds it to tree, and returns its index:
    /// - `(children)[label][:branch_length]`
    /// - An empty label leaves the vertex unnamed
    fn parse_internal_vertex(&mut self, parser: &mut ByteParser, tree: &mut Tree) -> Result<VertexIndex, ParsingError> {
        let children = self.parse_children(parser, tree)?;

        let label = parser.parse_label(NEWICK_LABEL_DELIMITERS)?;
        let name = (!label.is_empty()).then_some(label);
        let branch_length = self.parse_branch_length(parser)?;

        Ok(tree.add_branch(name, children, branch_length))
    }

    /// Parses the children list `(vertex, ..., vertex)` and returns their indices:
    /// - Expects parser at opening `(`
    ///   (caller should skip leading comments/whitespace)
    /// - An empty list `()` is a branch vertex without children
    fn parse_children(&mut self, parser: &mut ByteParser, tree: &mut Tree) -> Result<Vec<VertexIndex>, ParsingError> {
        if !parser.consume_if(b'(') {
            return Err(ParsingError::invalid_newick_string(
                parser,
                format!("Expected '(' before children but found {:?}", parser.peek().map(|b| b as char)),
            ));
        }

        let mut children = Vec::with_capacity(2);
        parser.skip_comment_and_whitespace()?;
        if parser.consume_if(b')') {
            return Ok(children);
        }
        loop {
            children.push(self.parse_vertex(parser, tree)?);

            parser.skip_comment_and_whitespace()?;
            if parser.consume_if(b',') {
                continue;
            }
            if parser.consume_if(b')') {
                break;
            }
            return Err(match parser.peek() {
                Some(b) => ParsingError::invalid_newick_string(
                    parser,
                    format!("Expected ',' or ')' after child but found {:?}", b as char),
                ),
                None => ParsingError::unexpected_eof(parser),
            });
        }

        Ok(children)
    }

    /// Parses leaf vertex and adds it to tree:
    /// - `label[:branch_length]`
    /// - Expects parser at start of label
    fn parse_leaf(&mut self, parser: &mut ByteParser, tree: &mut Tree) -> Result<VertexIndex, ParsingError> {
        let label = parser.parse_label(NEWICK_LABEL_DELIMITERS)?;
        if label.is_empty() {
            return Err(ParsingError::empty_leaf_label(parser));
        }
        let branch_length = self.parse_branch_length(parser)?;

        let index = tree.add_leaf(label, branch_length);
        if !self.know_num_leaves {
            self.num_leaves += 1;
        }

        Ok(index)
    }

    /// Parses optional branch length `[:number]`:
    /// - Skips comments/whitespace before and after `:`
    /// - Supports scientific notation (e.g., `1.5e-10`)
    ///
    /// # Returns
    /// - [BranchLength] if found branch length and was able to parse it
    /// - `None` if found no branch length
    /// - [ParsingError] if the value is not a finite, non-negative number
    fn parse_branch_length(&mut self, parser: &mut ByteParser) -> Result<Option<BranchLength>, ParsingError> {
        parser.skip_comment_and_whitespace()?;
        if !parser.consume_if(b':') {
            return Ok(None);
        }
        parser.skip_comment_and_whitespace()?;

        let mut branch_length_str = String::new();
        while let Some(b) = parser.peek() {
            // Valid characters for a float: digits, '.', '-', '+', 'e', 'E'
            if b.is_ascii_digit() || b == b'.' || b == b'-' || b == b'+' || b == b'e' || b == b'E' {
                branch_length_str.push(b as char);
                parser.next_byte();
            } else {
                break;
            }
        }

        branch_length_str
            .parse::<f64>()
            .ok()
            .and_then(BranchLength::try_new)
            .map(Some)
            .ok_or_else(|| ParsingError::invalid_branch_length(parser, branch_length_str))
    }
}
