//! Storefront API operations.
//!
//! Each operation is a unit struct implementing [`GraphQLQuery`] by hand, so
//! the request envelope and response decoding come from `graphql_client`
//! while the documents stay readable next to their variables.

use graphql_client::{GraphQLQuery, QueryBody};
use serde::{Deserialize, Serialize};

use super::types::{
    AttributeInput, Cart, CartLineInput, CartLineUpdateInput, CartUserError, Collection, Product,
    ProductConnection, ProductSortKey,
};

macro_rules! image_fields {
    () => {
        "url altText width height"
    };
}

macro_rules! money_fields {
    () => {
        "amount currencyCode"
    };
}

macro_rules! product_fragment {
    () => {
        concat!(
            "fragment ProductFields on Product { ",
            "id handle title description descriptionHtml availableForSale vendor productType tags ",
            "featuredImage { ", image_fields!(), " } ",
            "images(first: 10) { nodes { ", image_fields!(), " } } ",
            "priceRange { minVariantPrice { ", money_fields!(), " } maxVariantPrice { ", money_fields!(), " } } ",
            "variants(first: 50) { nodes { id title availableForSale sku ",
            "price { ", money_fields!(), " } compareAtPrice { ", money_fields!(), " } ",
            "selectedOptions { name value } image { ", image_fields!(), " } } } ",
            "}"
        )
    };
}

macro_rules! cart_fragment {
    () => {
        concat!(
            "fragment CartFields on Cart { ",
            "id checkoutUrl totalQuantity note ",
            "attributes { key value } discountCodes { code applicable } ",
            "cost { subtotalAmount { ", money_fields!(), " } totalAmount { ", money_fields!(), " } } ",
            "lines(first: 100) { nodes { id quantity attributes { key value } ",
            "cost { amountPerQuantity { ", money_fields!(), " } totalAmount { ", money_fields!(), " } } ",
            "merchandise { ... on ProductVariant { id title price { ", money_fields!(), " } ",
            "image { ", image_fields!(), " } product { id handle title } } } } } ",
            "}"
        )
    };
}

macro_rules! cart_mutation {
    ($name:literal, $field:literal, $params:literal, $args:literal) => {
        concat!(
            "mutation ", $name, "(", $params, ") { ",
            $field, "(", $args, ") { cart { ...CartFields } userErrors { code field message } } ",
            "} ",
            cart_fragment!()
        )
    };
}

/// Implement [`GraphQLQuery`] for an operation.
macro_rules! operation {
    ($op:ident, $name:literal, $vars:ty, $data:ty, $document:expr) => {
        pub struct $op;

        impl GraphQLQuery for $op {
            type Variables = $vars;
            type ResponseData = $data;

            fn build_query(variables: Self::Variables) -> QueryBody<Self::Variables> {
                QueryBody {
                    variables,
                    query: $document,
                    operation_name: $name,
                }
            }
        }
    };
}

// =============================================================================
// Products and Collections
// =============================================================================

#[derive(Debug, Serialize)]
pub struct HandleVariables {
    pub handle: String,
}

#[derive(Debug, Deserialize)]
pub struct ProductData {
    pub product: Option<Product>,
}

operation!(
    GetProductByHandle,
    "GetProductByHandle",
    HandleVariables,
    ProductData,
    concat!(
        "query GetProductByHandle($handle: String!) { product(handle: $handle) { ...ProductFields } } ",
        product_fragment!()
    )
);

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductsVariables {
    pub first: i64,
    pub after: Option<String>,
    pub query: Option<String>,
    pub sort_key: Option<ProductSortKey>,
    pub reverse: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct ProductsData {
    pub products: ProductConnection,
}

operation!(
    GetProducts,
    "GetProducts",
    ProductsVariables,
    ProductsData,
    concat!(
        "query GetProducts($first: Int!, $after: String, $query: String, $sortKey: ProductSortKeys, $reverse: Boolean) { ",
        "products(first: $first, after: $after, query: $query, sortKey: $sortKey, reverse: $reverse) { ",
        "nodes { ...ProductFields } pageInfo { hasNextPage endCursor } } } ",
        product_fragment!()
    )
);

#[derive(Debug, Serialize)]
pub struct IdsVariables {
    pub ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct NodesData {
    /// `null` for ids that no longer exist.
    pub nodes: Vec<Option<Product>>,
}

operation!(
    GetProductsByIds,
    "GetProductsByIds",
    IdsVariables,
    NodesData,
    concat!(
        "query GetProductsByIds($ids: [ID!]!) { nodes(ids: $ids) { ... on Product { ...ProductFields } } } ",
        product_fragment!()
    )
);

#[derive(Debug, Serialize)]
pub struct CollectionVariables {
    pub handle: String,
    pub first: i64,
    pub after: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CollectionData {
    pub collection: Option<Collection>,
}

operation!(
    GetCollectionByHandle,
    "GetCollectionByHandle",
    CollectionVariables,
    CollectionData,
    concat!(
        "query GetCollectionByHandle($handle: String!, $first: Int!, $after: String) { ",
        "collection(handle: $handle) { id handle title description image { ", image_fields!(), " } ",
        "products(first: $first, after: $after) { nodes { ...ProductFields } pageInfo { hasNextPage endCursor } } } } ",
        product_fragment!()
    )
);

// =============================================================================
// Cart
// =============================================================================

/// Result of every cart mutation.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartPayload {
    pub cart: Option<Cart>,
    #[serde(default)]
    pub user_errors: Vec<CartUserError>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartInput {
    pub lines: Vec<CartLineInput>,
    pub attributes: Vec<AttributeInput>,
}

#[derive(Debug, Serialize)]
pub struct CreateCartVariables {
    pub input: CartInput,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCartData {
    pub cart_create: Option<CartPayload>,
}

operation!(
    CreateCart,
    "CreateCart",
    CreateCartVariables,
    CreateCartData,
    cart_mutation!("CreateCart", "cartCreate", "$input: CartInput!", "input: $input")
);

#[derive(Debug, Serialize)]
pub struct CartIdVariables {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct CartData {
    pub cart: Option<Cart>,
}

operation!(
    GetCart,
    "GetCart",
    CartIdVariables,
    CartData,
    concat!(
        "query GetCart($id: ID!) { cart(id: $id) { ...CartFields } } ",
        cart_fragment!()
    )
);

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddLinesVariables {
    pub cart_id: String,
    pub lines: Vec<CartLineInput>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddLinesData {
    pub cart_lines_add: Option<CartPayload>,
}

operation!(
    AddToCart,
    "AddToCart",
    AddLinesVariables,
    AddLinesData,
    cart_mutation!(
        "AddToCart",
        "cartLinesAdd",
        "$cartId: ID!, $lines: [CartLineInput!]!",
        "cartId: $cartId, lines: $lines"
    )
);

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLinesVariables {
    pub cart_id: String,
    pub lines: Vec<CartLineUpdateInput>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLinesData {
    pub cart_lines_update: Option<CartPayload>,
}

operation!(
    UpdateCartLines,
    "UpdateCartLines",
    UpdateLinesVariables,
    UpdateLinesData,
    cart_mutation!(
        "UpdateCartLines",
        "cartLinesUpdate",
        "$cartId: ID!, $lines: [CartLineUpdateInput!]!",
        "cartId: $cartId, lines: $lines"
    )
);

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveLinesVariables {
    pub cart_id: String,
    pub line_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveLinesData {
    pub cart_lines_remove: Option<CartPayload>,
}

operation!(
    RemoveFromCart,
    "RemoveFromCart",
    RemoveLinesVariables,
    RemoveLinesData,
    cart_mutation!(
        "RemoveFromCart",
        "cartLinesRemove",
        "$cartId: ID!, $lineIds: [ID!]!",
        "cartId: $cartId, lineIds: $lineIds"
    )
);

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountCodesVariables {
    pub cart_id: String,
    pub discount_codes: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountCodesData {
    pub cart_discount_codes_update: Option<CartPayload>,
}

operation!(
    UpdateCartDiscountCodes,
    "UpdateCartDiscountCodes",
    DiscountCodesVariables,
    DiscountCodesData,
    cart_mutation!(
        "UpdateCartDiscountCodes",
        "cartDiscountCodesUpdate",
        "$cartId: ID!, $discountCodes: [String!]",
        "cartId: $cartId, discountCodes: $discountCodes"
    )
);

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributesVariables {
    pub cart_id: String,
    pub attributes: Vec<AttributeInput>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributesData {
    pub cart_attributes_update: Option<CartPayload>,
}

operation!(
    UpdateCartAttributes,
    "UpdateCartAttributes",
    AttributesVariables,
    AttributesData,
    cart_mutation!(
        "UpdateCartAttributes",
        "cartAttributesUpdate",
        "$cartId: ID!, $attributes: [AttributeInput!]!",
        "cartId: $cartId, attributes: $attributes"
    )
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_documents_include_their_fragments() {
        let body = GetProductByHandle::build_query(HandleVariables {
            handle: "fern".to_owned(),
        });
        assert_eq!(body.operation_name, "GetProductByHandle");
        assert!(body.query.contains("fragment ProductFields on Product"));

        let body = AddToCart::build_query(AddLinesVariables {
            cart_id: "c".to_owned(),
            lines: vec![],
        });
        assert!(body.query.starts_with("mutation AddToCart("));
        assert!(body.query.contains("cartLinesAdd(cartId: $cartId, lines: $lines)"));
        assert!(body.query.contains("fragment CartFields on Cart"));
    }

    #[test]
    fn test_documents_have_balanced_braces() {
        let documents = [
            GetProductByHandle::build_query(HandleVariables { handle: String::new() }).query,
            GetCart::build_query(CartIdVariables { id: String::new() }).query,
            UpdateCartAttributes::build_query(AttributesVariables {
                cart_id: String::new(),
                attributes: vec![],
            })
            .query,
        ];
        for document in documents {
            let open = document.matches('{').count();
            let close = document.matches('}').count();
            assert_eq!(open, close, "unbalanced document: {document}");
        }
    }

    #[test]
    fn test_variables_serialize_for_graphql() {
        let body = GetProducts::build_query(ProductsVariables {
            first: 12,
            after: None,
            query: Some("tag:fern".to_owned()),
            sort_key: Some(ProductSortKey::Price),
            reverse: None,
        });
        let json = serde_json::to_value(&body).unwrap_or_default();
        assert_eq!(json["operationName"], "GetProducts");
        assert_eq!(json["variables"]["sortKey"], "PRICE");
        assert_eq!(json["variables"]["first"], 12);
    }
}
